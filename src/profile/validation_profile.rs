// src/profile/validation_profile.rs
// Named validation profile resolved against a ConfigStore

use super::category::CategoryRegistry;
use super::presets::{self, Preset};
use super::threshold::{ThresholdRegistry, normalize_name};
use crate::config::ConfigStore;
use crate::error::{Result, ValbotError};
use crate::validation::{Issue, Severity};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Profile names accepted on the command line and in `validation.profile`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileName {
    Strict,
    Standard,
    Minimal,
    Custom,
}

impl ProfileName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Standard => "standard",
            Self::Minimal => "minimal",
            Self::Custom => "custom",
        }
    }

    /// Fixed preset, `None` for custom
    pub fn preset(&self) -> Option<&'static Preset> {
        match self {
            Self::Strict => Some(&presets::STRICT),
            Self::Standard => Some(&presets::STANDARD),
            Self::Minimal => Some(&presets::MINIMAL),
            Self::Custom => None,
        }
    }
}

impl FromStr for ProfileName {
    type Err = ValbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "standard" => Ok(Self::Standard),
            "minimal" => Ok(Self::Minimal),
            "custom" => Ok(Self::Custom),
            _ => Err(ValbotError::UnknownProfile(s.to_string())),
        }
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved flags of one category under the active profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySettings {
    pub enabled: bool,
    pub required: bool,
}

const CUSTOM_PROFILE_KEY: &str = "validation.custom_profile";

/// A validation profile, immutable once built
#[derive(Debug, Clone)]
pub struct ValidationProfile {
    name: ProfileName,
    categories: CategoryRegistry,
    threshold_registry: ThresholdRegistry,
    thresholds: BTreeMap<String, f64>,
    settings: BTreeMap<String, CategorySettings>,
    fail_on_any_issue: bool,
    fail_fast: bool,
    timeout: Duration,
}

impl ValidationProfile {
    /// Build a profile by name; unknown names fail with `UnknownProfile`
    pub fn new(name: &str, config: &ConfigStore) -> Result<Self> {
        let name: ProfileName = name.parse()?;
        let categories = CategoryRegistry::from_config(config);
        let threshold_registry = ThresholdRegistry::from_config(config);
        let preset = name.preset();

        let mut thresholds: BTreeMap<String, f64> = preset
            .map(|p| {
                p.thresholds()
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();

        if name == ProfileName::Custom {
            if let Some(custom) = config.lookup(CUSTOM_PROFILE_KEY).and_then(|v| v.as_object()) {
                overlay_thresholds(&mut thresholds, &threshold_registry, custom, CUSTOM_PROFILE_KEY);
            }
            if thresholds.is_empty() {
                warn!("Custom profile selected but no validation.custom_profile thresholds are set");
            }
        }

        // Per-category overrides apply to every profile
        for category in categories.iter() {
            let section = format!("agents.{}", category.config_key);
            if let Some(agent) = config.lookup(&section).and_then(|v| v.as_object()) {
                overlay_thresholds(&mut thresholds, &threshold_registry, agent, &section);
            }
        }

        let mut settings = BTreeMap::new();
        for category in categories.iter() {
            let default_required = match preset {
                Some(p) => p.required_for(&category.name).unwrap_or(false),
                None => custom_required(config, &category.name),
            };
            let section = format!("agents.{}", category.config_key);
            let enabled = config.get_bool(&format!("{}.enabled", section), default_required);
            let required = enabled && config.get_bool(&format!("{}.required", section), enabled);
            settings.insert(category.name.clone(), CategorySettings { enabled, required });
        }

        let fail_on_any_issue = match preset {
            Some(p) => p.fail_on_any_issue,
            None => config.get_bool(&format!("{}.fail_on_any_issue", CUSTOM_PROFILE_KEY), false),
        };
        let default_timeout = preset
            .map(|p| p.timeout_secs)
            .unwrap_or(presets::CUSTOM_TIMEOUT_SECS);
        let timeout = Duration::from_secs(config.get_u64("validation.timeout", default_timeout));

        debug!(
            profile = %name,
            thresholds = ?thresholds,
            timeout_secs = timeout.as_secs(),
            "Resolved validation profile"
        );

        Ok(Self {
            name,
            categories,
            threshold_registry,
            thresholds,
            settings,
            fail_on_any_issue,
            fail_fast: config.get_bool("validation.fail_fast", false),
            timeout,
        })
    }

    /// Build the profile named by `validation.profile`
    pub fn from_config(config: &ConfigStore) -> Result<Self> {
        let name = config
            .get_str("validation.profile")
            .unwrap_or(crate::config::defaults::DEFAULT_PROFILE)
            .to_string();
        Self::new(&name, config)
    }

    pub fn name(&self) -> ProfileName {
        self.name
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn threshold_registry(&self) -> &ThresholdRegistry {
        &self.threshold_registry
    }

    pub fn settings(&self, category: &str) -> Option<CategorySettings> {
        let spec = self.categories.get(category)?;
        self.settings.get(&spec.name).copied()
    }

    /// Whether a failure in this category fails the run; false for unknown categories
    pub fn is_required(&self, category: &str) -> bool {
        self.settings(category).is_some_and(|s| s.required)
    }

    pub fn is_enabled(&self, category: &str) -> bool {
        self.settings(category).is_some_and(|s| s.enabled)
    }

    /// Enabled categories in registry order
    pub fn enabled_categories(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| self.settings.get(&c.name).is_some_and(|s| s.enabled))
            .map(|c| c.name.clone())
            .collect()
    }

    /// Configured value of a threshold
    pub fn threshold(&self, name: &str) -> Result<f64> {
        let spec = self
            .threshold_registry
            .get(name)
            .ok_or_else(|| ValbotError::UnknownThreshold {
                profile: self.name.to_string(),
                name: name.to_string(),
            })?;
        self.thresholds
            .get(&spec.name)
            .copied()
            .ok_or_else(|| ValbotError::MissingThreshold {
                profile: self.name.to_string(),
                name: spec.name.clone(),
            })
    }

    pub fn thresholds(&self) -> &BTreeMap<String, f64> {
        &self.thresholds
    }

    /// Compare a measurement against a threshold in that threshold's direction
    pub fn is_threshold_met(&self, name: &str, measured: f64) -> Result<bool> {
        let value = self.threshold(name)?;
        let comparator = self
            .threshold_registry
            .get(name)
            .map(|s| s.comparator)
            .ok_or_else(|| ValbotError::UnknownThreshold {
                profile: self.name.to_string(),
                name: name.to_string(),
            })?;
        Ok(comparator.is_met(measured, value))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn fail_on_any_issue(&self) -> bool {
        self.fail_on_any_issue
    }

    /// Whether a list of issues fails validation under this profile
    pub fn should_fail_validation(&self, issues: &[Issue]) -> bool {
        if self.fail_on_any_issue {
            return !issues.is_empty();
        }
        let errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count() as f64;
        match self.thresholds.get("lint_error") {
            Some(limit) => errors > *limit,
            None => errors > 0.0,
        }
    }
}

/// Overlay `<name>_threshold` keys of a config section onto `thresholds`
fn overlay_thresholds(
    thresholds: &mut BTreeMap<String, f64>,
    registry: &ThresholdRegistry,
    section: &serde_json::Map<String, Value>,
    section_path: &str,
) {
    for (key, value) in section {
        if !key.ends_with("_threshold") {
            continue;
        }
        // Unset
        if value.is_null() {
            continue;
        }
        let Some(number) = value.as_f64() else {
            warn!(key = %format!("{}.{}", section_path, key), "Ignoring non-numeric threshold");
            continue;
        };
        match registry.get(key) {
            Some(spec) => {
                thresholds.insert(spec.name.clone(), number);
            }
            None => warn!(
                key = %format!("{}.{}", section_path, key),
                threshold = %normalize_name(key),
                "Ignoring threshold without a registered direction"
            ),
        }
    }
}

fn custom_required(config: &ConfigStore, category: &str) -> bool {
    let flag = match category {
        "test" | "code_quality" => return true,
        "type_check" => ("type_check_required", true),
        "security" => ("security_scan_required", false),
        "performance" => ("performance_check_required", false),
        other => {
            return config.get_bool(&format!("{}.{}_required", CUSTOM_PROFILE_KEY, other), false);
        }
    };
    config.get_bool(&format!("{}.{}", CUSTOM_PROFILE_KEY, flag.0), flag.1)
}
