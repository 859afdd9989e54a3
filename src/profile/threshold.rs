// src/profile/threshold.rs
// Threshold registry - named thresholds paired with a fixed comparison direction

use crate::config::ConfigStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Direction in which a measured value must sit relative to its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// `measured >= threshold` (coverage-style)
    AtLeast,
    /// `measured <= threshold` (complexity, error and warning counts)
    AtMost,
}

impl Comparator {
    pub fn is_met(self, measured: f64, threshold: f64) -> bool {
        match self {
            Self::AtLeast => measured >= threshold,
            Self::AtMost => measured <= threshold,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "at_least" | ">=" | "min" => Some(Self::AtLeast),
            "at_most" | "<=" | "max" => Some(Self::AtMost),
            _ => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast => write!(f, ">="),
            Self::AtMost => write!(f, "<="),
        }
    }
}

/// A registered threshold
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    pub name: String,
    pub comparator: Comparator,
    pub aliases: Vec<String>,
}

impl ThresholdSpec {
    pub fn new(name: &str, comparator: Comparator, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            comparator,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Registry of known thresholds, keyed by canonical name
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    specs: Vec<ThresholdSpec>,
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Normalize a threshold name: lower-case, drop a trailing `_threshold`
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    lower
        .strip_suffix("_threshold")
        .map(String::from)
        .unwrap_or(lower)
}

impl ThresholdRegistry {
    /// Built-in thresholds shared by every profile
    pub fn builtin() -> Self {
        Self {
            specs: vec![
                ThresholdSpec::new("test_coverage", Comparator::AtLeast, &["coverage"]),
                ThresholdSpec::new("complexity", Comparator::AtMost, &["max_complexity"]),
                ThresholdSpec::new("lint_error", Comparator::AtMost, &["lint_errors", "error"]),
                ThresholdSpec::new("lint_warning", Comparator::AtMost, &["lint_warnings", "warning"]),
            ],
        }
    }

    /// Built-ins plus directions declared under `validation.threshold_directions`
    pub fn from_config(config: &ConfigStore) -> Self {
        let mut registry = Self::builtin();
        if let Some(directions) = config
            .lookup("validation.threshold_directions")
            .and_then(|v| v.as_object())
        {
            for (name, direction) in directions {
                match direction.as_str().and_then(Comparator::from_str) {
                    Some(comparator) => {
                        registry.register(ThresholdSpec::new(&normalize_name(name), comparator, &[]))
                    }
                    None => warn!(threshold = %name, "Ignoring threshold with unknown direction"),
                }
            }
        }
        registry
    }

    /// Add a threshold, replacing any existing one with the same name
    pub fn register(&mut self, spec: ThresholdSpec) {
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
    }

    /// Look up by canonical name, alias, or either with a `_threshold` suffix
    pub fn get(&self, name: &str) -> Option<&ThresholdSpec> {
        let key = normalize_name(name);
        self.specs
            .iter()
            .find(|s| s.name == key)
            .or_else(|| self.specs.iter().find(|s| s.aliases.iter().any(|a| *a == key)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }
}
