// src/orchestrator/report.rs
// Aggregated run report and its renderings

use crate::error::Result;
use crate::reasoning::{BackendKind, Thought};
use crate::validation::{StepStatus, ValidationStepResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Overall verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Passed,
    Failed,
}

/// Output format for reports (`validation.report_format`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Yaml,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "text" | "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// One validation type's recorded outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub result: ValidationStepResult,
    pub required: bool,
    /// Plan step that produced the entry; `None` when the plan never reached it
    #[serde(default)]
    pub step_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReport {
    pub run_id: String,
    pub prompt: String,
    pub target: PathBuf,
    pub profile: String,
    pub reasoning_backend_used: BackendKind,
    pub overall_status: OverallStatus,
    pub results: BTreeMap<String, ReportEntry>,
    pub execution_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub abandoned: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thoughts: Vec<Thought>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl AggregatedReport {
    pub fn passed(&self) -> bool {
        self.overall_status == OverallStatus::Passed
    }

    pub fn status_of(&self, validation_type: &str) -> Option<StepStatus> {
        self.results.get(validation_type).map(|e| e.result.status)
    }

    /// Overall status: passed iff every required entry passed
    pub fn compute_status(results: &BTreeMap<String, ReportEntry>) -> OverallStatus {
        if results
            .values()
            .filter(|e| e.required)
            .all(|e| e.result.status == StepStatus::Passed)
        {
            OverallStatus::Passed
        } else {
            OverallStatus::Failed
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Json => serde_json::to_string_pretty(self)?,
            ReportFormat::Yaml => serde_yaml::to_string(self)?,
            ReportFormat::Text => self.render_text(),
        })
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let verdict = match self.overall_status {
            OverallStatus::Passed => "PASSED",
            OverallStatus::Failed => "FAILED",
        };
        let _ = writeln!(out, "Validation {}: {}", self.run_id, verdict);
        let _ = writeln!(out, "  prompt:    {}", self.prompt);
        let _ = writeln!(out, "  target:    {}", self.target.display());
        let _ = writeln!(
            out,
            "  profile:   {} (reasoning: {})",
            self.profile, self.reasoning_backend_used
        );
        let _ = writeln!(out, "  duration:  {}ms", self.duration_ms);
        out.push('\n');

        for name in self.ordered_names() {
            let Some(entry) = self.results.get(name) else {
                continue;
            };
            let measured = entry
                .result
                .measured_value
                .map(|v| format!("{}", v))
                .unwrap_or_else(|| "-".to_string());
            let _ = write!(
                out,
                "  {:<14} {:<8} {:<9} {:>8}",
                name,
                entry.result.status,
                if entry.required { "required" } else { "optional" },
                measured
            );
            if let Some(message) = &entry.result.message {
                let _ = write!(out, "  {}", message);
            }
            out.push('\n');
        }

        if !self.abandoned.is_empty() {
            let _ = writeln!(out, "\n  abandoned: {}", self.abandoned.join(", "));
        }
        out
    }

    /// Execution order first, then anything recorded without running
    fn ordered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.execution_order.iter().map(String::as_str).collect();
        for name in self.results.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}
