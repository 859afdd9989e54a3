// src/config/file.rs
// File-based configuration (YAML or JSON, single file or directory)

use crate::error::{Result, ValbotError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions recognized as configuration sources
pub const CONFIG_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

fn load_error(path: &Path, reason: impl std::fmt::Display) -> ValbotError {
    ValbotError::ConfigLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Check whether a path has a recognized configuration extension
pub fn is_config_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext.as_str()))
}

/// Read and parse a single configuration file into a mapping
pub fn read_config_file(path: &Path) -> Result<Map<String, Value>> {
    let contents = std::fs::read_to_string(path).map_err(|e| load_error(path, e))?;
    parse_config(path, &contents)
}

/// Parse configuration text, choosing the format by the path's extension.
/// An empty document is an empty mapping; any other non-mapping is an error.
pub fn parse_config(path: &Path, contents: &str) -> Result<Map<String, Value>> {
    if contents.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = match extension_of(path).as_deref() {
        Some("json") => serde_json::from_str(contents).map_err(|e| load_error(path, e))?,
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).map_err(|e| load_error(path, e))?
        }
        other => {
            return Err(load_error(
                path,
                format!(
                    "unsupported configuration format '{}'",
                    other.unwrap_or("<none>")
                ),
            ));
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(load_error(path, "top-level value must be a mapping")),
    }
}

/// Read every configuration file in a directory, in lexicographic filename order
pub fn read_config_dir(dir: &Path) -> Result<Vec<(PathBuf, Map<String, Value>)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| load_error(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| load_error(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_config_file(&path) {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-configuration entry");
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    paths
        .into_iter()
        .map(|path| read_config_file(&path).map(|map| (path, map)))
        .collect()
}

/// Locate the per-user configuration file (~/.valbot/config.{yaml,yml,json})
pub fn user_config_path() -> Option<PathBuf> {
    let dir = dirs::home_dir()?.join(".valbot");
    ["config.yaml", "config.yml", "config.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Serialize a configuration tree, choosing the format by extension (JSON otherwise)
pub fn render_config(path: &Path, tree: &Value) -> Result<String> {
    match extension_of(path).as_deref() {
        Some("yaml") | Some("yml") => Ok(serde_yaml::to_string(tree)?),
        _ => Ok(serde_json::to_string_pretty(tree)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
validation:
  profile: strict
  linters: [flake8]
"#;
        let map = parse_config(Path::new("a.yaml"), yaml).unwrap();
        assert_eq!(map["validation"]["profile"], "strict");
        assert_eq!(map["validation"]["linters"][0], "flake8");
    }

    #[test]
    fn test_parse_json() {
        let map = parse_config(Path::new("a.json"), r#"{"model": {"id": "x"}}"#).unwrap();
        assert_eq!(map["model"]["id"], "x");
    }

    #[test]
    fn test_parse_empty_is_empty_mapping() {
        assert!(parse_config(Path::new("a.yml"), "   \n").unwrap().is_empty());
        assert!(parse_config(Path::new("a.json"), "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let err = parse_config(Path::new("bad.yaml"), "validation: [unclosed").unwrap_err();
        assert!(matches!(err, ValbotError::ConfigLoad { .. }));
    }

    #[test]
    fn test_parse_non_mapping_rejected() {
        let err = parse_config(Path::new("list.json"), "[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("mapping"));
    }

    #[test]
    fn test_parse_unsupported_extension() {
        let err = parse_config(Path::new("config.toml"), "a = 1").unwrap_err();
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_config_file(Path::new("/nonexistent/valbot.yaml")).unwrap_err();
        assert_eq!(err.kind(), "ConfigLoadError");
    }

    #[test]
    fn test_read_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "x: 2").unwrap();
        fs::write(dir.path().join("a.json"), r#"{"x": 1}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = read_config_dir(dir.path()).unwrap();
        let names: Vec<_> = loaded
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.yaml"]);
    }

    #[test]
    fn test_render_by_extension() {
        let tree = serde_json::json!({"a": {"b": 1}});
        let yaml = render_config(Path::new("out.yaml"), &tree).unwrap();
        assert!(yaml.contains("b: 1"));
        let json = render_config(Path::new("out.json"), &tree).unwrap();
        assert!(json.contains("\"b\": 1"));
    }
}
