// src/profile/category.rs
// Validation categories as data: config section, prompt keywords, thresholds

use crate::config::ConfigStore;
use tracing::debug;

/// Suffixes a prompt word may add to a keyword and still match it
const KEYWORD_INFLECTIONS: &[&str] = &["", "s", "es", "ed", "er", "ers", "ing", "ings"];

/// A validation category (test, code_quality, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct CategorySpec {
    /// Name used in reports and on the command line
    pub name: String,
    /// Section under `agents.` holding this category's settings
    pub config_key: String,
    /// Alternative names accepted from users
    pub aliases: Vec<String>,
    /// Words that select this category from a prompt
    pub keywords: Vec<String>,
    /// Thresholds evaluated against this category's results
    pub thresholds: Vec<String>,
    /// Threshold that a bare `measured_value` is compared against
    pub primary_threshold: Option<String>,
}

impl CategorySpec {
    pub fn new(name: &str, config_key: &str) -> Self {
        Self {
            name: name.to_string(),
            config_key: config_key.to_string(),
            aliases: Vec::new(),
            keywords: vec![name.to_string()],
            thresholds: Vec::new(),
            primary_threshold: None,
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Thresholds for this category; the first one is the primary threshold
    pub fn thresholds(mut self, thresholds: &[&str]) -> Self {
        self.thresholds = thresholds.iter().map(|s| s.to_string()).collect();
        self.primary_threshold = self.thresholds.first().cloned();
        self
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.config_key == name || self.aliases.iter().any(|a| a == name)
    }

    /// True if any word of `text` is one of this category's keywords,
    /// optionally followed by an inflection ("tests", "linter", "typing")
    pub fn matches_text(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .any(|word| {
                self.keywords.iter().any(|k| {
                    word.strip_prefix(k.as_str())
                        .is_some_and(|rest| KEYWORD_INFLECTIONS.contains(&rest))
                })
            })
    }
}

/// Ordered registry of categories; order drives default execution order
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: Vec<CategorySpec>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryRegistry {
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                CategorySpec::new("test", "test_validation")
                    .aliases(&["tests", "testing", "unit_test"])
                    .keywords(&["test", "coverage", "pytest", "unittest"])
                    .thresholds(&["test_coverage"]),
                CategorySpec::new("code_quality", "code_quality")
                    .aliases(&["lint", "linting", "quality"])
                    .keywords(&["lint", "quality", "style", "complexity", "flake8", "pylint"])
                    .thresholds(&["complexity", "lint_error", "lint_warning"]),
                CategorySpec::new("type_check", "type_check")
                    .aliases(&["types", "typing", "type_checking"])
                    .keywords(&["type", "typing", "mypy"]),
                CategorySpec::new("security", "security")
                    .aliases(&["security_scan"])
                    .keywords(&["security", "secure", "vulnerable", "vulnerability", "vulnerabilities", "bandit", "cve"]),
                CategorySpec::new("performance", "performance")
                    .aliases(&["perf", "benchmark"])
                    .keywords(&["performance", "perf", "benchmark", "latency", "speed"]),
            ],
        }
    }

    /// Built-ins plus categories declared under `validation.categories.<name>`
    ///
    /// ```yaml
    /// validation:
    ///   categories:
    ///     docs: {config_key: docs_check, keywords: [doc, readme], thresholds: [doc_coverage]}
    /// ```
    pub fn from_config(config: &ConfigStore) -> Self {
        let mut registry = Self::builtin();
        let Some(extra) = config
            .lookup("validation.categories")
            .and_then(|v| v.as_object())
        else {
            return registry;
        };

        for (name, settings) in extra {
            let key = format!("validation.categories.{}", name);
            let config_key = config
                .get_str(&format!("{}.config_key", key))
                .unwrap_or(name)
                .to_string();
            let mut spec = CategorySpec::new(name, &config_key);
            if let Some(keywords) = config.get_string_list(&format!("{}.keywords", key)) {
                spec.keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
            }
            if let Some(thresholds) = config.get_string_list(&format!("{}.thresholds", key)) {
                spec.primary_threshold = thresholds.first().cloned();
                spec.thresholds = thresholds;
            }
            debug!(category = %name, settings = %settings, "Registered category from configuration");
            registry.register(spec);
        }
        registry
    }

    /// Add a category, replacing any existing one with the same name
    pub fn register(&mut self, spec: CategorySpec) {
        if let Some(existing) = self.categories.iter_mut().find(|c| c.name == spec.name) {
            *existing = spec;
        } else {
            self.categories.push(spec);
        }
    }

    /// Resolve a category by name, config key or alias (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&CategorySpec> {
        let key = name.trim().to_lowercase();
        self.categories.iter().find(|c| c.answers_to(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategorySpec> {
        self.categories.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Categories whose keywords appear in the prompt, in registry order
    pub fn match_prompt(&self, prompt: &str) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.matches_text(prompt))
            .map(|c| c.name.clone())
            .collect()
    }
}
