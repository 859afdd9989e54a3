// src/validation/result.rs
// Normalized result of a single validation step

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a validation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Error => "error",
        })
    }
}

/// Severity of an issue reported by an external tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single finding (failed test, lint message, type error...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Issue {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Result of running one external check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStepResult {
    pub validation_type: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_value: Option<f64>,
    /// Named measurements, keyed by threshold name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Tool output, opaque to the orchestrator
    #[serde(default)]
    pub raw_output: Value,
    #[serde(default)]
    pub duration_ms: u64,
}

impl ValidationStepResult {
    pub fn new(validation_type: impl Into<String>, status: StepStatus) -> Self {
        Self {
            validation_type: validation_type.into(),
            status,
            measured_value: None,
            metrics: BTreeMap::new(),
            issues: Vec::new(),
            message: None,
            raw_output: Value::Null,
            duration_ms: 0,
        }
    }

    pub fn passed(validation_type: impl Into<String>) -> Self {
        Self::new(validation_type, StepStatus::Passed)
    }

    pub fn failed(validation_type: impl Into<String>) -> Self {
        Self::new(validation_type, StepStatus::Failed)
    }

    pub fn skipped(validation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(validation_type, StepStatus::Skipped).with_message(reason)
    }

    pub fn error(validation_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(validation_type, StepStatus::Error).with_message(message)
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_measured(mut self, value: f64) -> Self {
        self.measured_value = Some(value);
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_raw_output(mut self, raw: Value) -> Self {
        self.raw_output = raw;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_passed(&self) -> bool {
        self.status == StepStatus::Passed
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }
}
