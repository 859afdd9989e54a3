// src/profile/presets.rs
// Built-in profile presets (strict, standard, minimal)

/// Fixed settings of a built-in profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub test_coverage: f64,
    pub complexity: f64,
    pub lint_error: f64,
    pub lint_warning: f64,
    pub type_check_required: bool,
    pub security_required: bool,
    pub performance_required: bool,
    pub fail_on_any_issue: bool,
    pub level: &'static str,
    pub timeout_secs: u64,
}

pub const STRICT: Preset = Preset {
    test_coverage: 90.0,
    complexity: 7.0,
    lint_error: 0.0,
    lint_warning: 5.0,
    type_check_required: true,
    security_required: true,
    performance_required: true,
    fail_on_any_issue: true,
    level: "high",
    timeout_secs: 120,
};

pub const STANDARD: Preset = Preset {
    test_coverage: 70.0,
    complexity: 10.0,
    lint_error: 0.0,
    lint_warning: 10.0,
    type_check_required: true,
    security_required: false,
    performance_required: false,
    fail_on_any_issue: false,
    level: "medium",
    timeout_secs: 60,
};

pub const MINIMAL: Preset = Preset {
    test_coverage: 50.0,
    complexity: 15.0,
    lint_error: 5.0,
    lint_warning: 20.0,
    type_check_required: false,
    security_required: false,
    performance_required: false,
    fail_on_any_issue: false,
    level: "low",
    timeout_secs: 30,
};

/// Timeout for the custom profile when `validation.timeout` is unset
pub const CUSTOM_TIMEOUT_SECS: u64 = 60;

impl Preset {
    /// Threshold values keyed by canonical threshold name
    pub fn thresholds(&self) -> [(&'static str, f64); 4] {
        [
            ("test_coverage", self.test_coverage),
            ("complexity", self.complexity),
            ("lint_error", self.lint_error),
            ("lint_warning", self.lint_warning),
        ]
    }

    /// Whether the preset requires a category; `None` for categories it does not know
    pub fn required_for(&self, category: &str) -> Option<bool> {
        match category {
            "test" | "code_quality" => Some(true),
            "type_check" => Some(self.type_check_required),
            "security" => Some(self.security_required),
            "performance" => Some(self.performance_required),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_literals() {
        assert_eq!(
            STRICT.thresholds(),
            [("test_coverage", 90.0), ("complexity", 7.0), ("lint_error", 0.0), ("lint_warning", 5.0)]
        );
        assert_eq!(
            STANDARD.thresholds(),
            [("test_coverage", 70.0), ("complexity", 10.0), ("lint_error", 0.0), ("lint_warning", 10.0)]
        );
        assert_eq!(
            MINIMAL.thresholds(),
            [("test_coverage", 50.0), ("complexity", 15.0), ("lint_error", 5.0), ("lint_warning", 20.0)]
        );
    }

    #[test]
    fn test_required_columns() {
        for category in ["type_check", "security", "performance"] {
            assert_eq!(STRICT.required_for(category), Some(true));
        }
        assert_eq!(STANDARD.required_for("type_check"), Some(true));
        assert_eq!(STANDARD.required_for("security"), Some(false));
        assert_eq!(STANDARD.required_for("performance"), Some(false));
        assert_eq!(MINIMAL.required_for("type_check"), Some(false));
        assert_eq!(MINIMAL.required_for("test"), Some(true));
        assert_eq!(MINIMAL.required_for("docs"), None);
    }
}
