// src/error.rs
// Standardized error types for valbot

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the valbot library
#[derive(Error, Debug)]
pub enum ValbotError {
    #[error("failed to load configuration from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("configuration key not found: {0}")]
    ConfigKey(String),

    #[error("unknown validation profile: {0}")]
    UnknownProfile(String),

    #[error("unknown threshold '{name}' for profile '{profile}'")]
    UnknownThreshold { profile: String, name: String },

    #[error("threshold '{name}' is not configured for profile '{profile}'")]
    MissingThreshold { profile: String, name: String },

    #[error("unknown validation type: {0}")]
    UnknownValidationType(String),

    #[error("reasoning backend error: {0}")]
    Reasoning(String),

    #[error("operation timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unknown error: {0}")]
    Other(String),
}

/// Convenience type alias for Result using ValbotError
pub type Result<T> = std::result::Result<T, ValbotError>;

impl ValbotError {
    /// Stable identifier printed by the CLI for fatal errors
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } => "ConfigLoadError",
            Self::ConfigKey(_) => "ConfigKeyError",
            Self::UnknownProfile(_) => "UnknownProfileError",
            Self::UnknownThreshold { .. } => "UnknownThresholdError",
            Self::MissingThreshold { .. } => "MissingThresholdError",
            Self::UnknownValidationType(_) => "UnknownValidationTypeError",
            Self::Reasoning(_) => "ReasoningError",
            Self::Timeout(_) => "TimeoutError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Yaml(_) => "YamlError",
            Self::Other(_) => "Error",
        }
    }

    /// The offending key, path or name, when the error carries one
    pub fn key(&self) -> Option<String> {
        match self {
            Self::ConfigLoad { path, .. } => Some(path.display().to_string()),
            Self::ConfigKey(key) => Some(key.clone()),
            Self::UnknownProfile(name) => Some(name.clone()),
            Self::UnknownThreshold { name, .. } | Self::MissingThreshold { name, .. } => {
                Some(name.clone())
            }
            Self::UnknownValidationType(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// True for errors that abort a run before any report exists
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Reasoning(_) | Self::Timeout(_))
    }
}

impl From<String> for ValbotError {
    fn from(s: String) -> Self {
        ValbotError::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Display tests
    // ============================================================================

    #[test]
    fn test_config_load_error() {
        let err = ValbotError::ConfigLoad {
            path: PathBuf::from("/etc/valbot.yaml"),
            reason: "invalid YAML".to_string(),
        };
        assert!(err.to_string().contains("/etc/valbot.yaml"));
        assert!(err.to_string().contains("invalid YAML"));
        assert_eq!(err.kind(), "ConfigLoadError");
        assert_eq!(err.key().as_deref(), Some("/etc/valbot.yaml"));
    }

    #[test]
    fn test_config_key_error() {
        let err = ValbotError::ConfigKey("validation.profile".to_string());
        assert!(err.to_string().contains("validation.profile"));
        assert_eq!(err.kind(), "ConfigKeyError");
    }

    #[test]
    fn test_threshold_errors() {
        let unknown = ValbotError::UnknownThreshold {
            profile: "standard".to_string(),
            name: "latency".to_string(),
        };
        assert_eq!(unknown.kind(), "UnknownThresholdError");
        assert_eq!(unknown.key().as_deref(), Some("latency"));

        let missing = ValbotError::MissingThreshold {
            profile: "custom".to_string(),
            name: "test_coverage".to_string(),
        };
        assert!(missing.to_string().contains("custom"));
        assert_eq!(missing.kind(), "MissingThresholdError");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ValbotError::UnknownValidationType("lint".into()).is_fatal());
        assert!(!ValbotError::Reasoning("connection refused".into()).is_fatal());
        assert!(!ValbotError::Timeout(30).is_fatal());
    }

    // ============================================================================
    // From implementations tests
    // ============================================================================

    #[test]
    fn test_from_string() {
        let err: ValbotError = "some error".to_string().into();
        assert!(matches!(err, ValbotError::Other(_)));
        assert!(err.key().is_none());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ValbotError = io_err.into();
        assert!(matches!(err, ValbotError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_json::Value>("a: [unclosed").unwrap_err();
        let err: ValbotError = yaml_err.into();
        assert_eq!(err.kind(), "YamlError");
    }
}
