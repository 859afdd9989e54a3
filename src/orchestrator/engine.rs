// src/orchestrator/engine.rs
// SequentialOrchestrator - plan, run and gate validation steps, then aggregate

use super::report::{AggregatedReport, ReportEntry};
use super::state::{RunState, StateMachine};
use crate::config::ConfigStore;
use crate::config::defaults::{DEFAULT_MAX_STEPS, DEFAULT_PROFILE};
use crate::error::{Result, ValbotError};
use crate::profile::{CategorySpec, ValidationProfile};
use crate::reasoning::{
    self, BackendKind, MockBackend, Plan, PlanContext, ReasoningBackend, Thought,
};
use crate::validation::{StepOptions, StepStatus, ValidationStepRegistry, ValidationStepResult};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Input for one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: String,
    pub target: PathBuf,
    /// Profile name; `validation.profile` when unset
    pub profile: Option<String>,
    /// Explicit validation types; selected from the prompt when unset
    pub validation_types: Option<Vec<String>>,
    pub config: ConfigStore,
}

impl RunRequest {
    pub fn new(prompt: impl Into<String>, target: impl Into<PathBuf>, config: ConfigStore) -> Self {
        Self {
            prompt: prompt.into(),
            target: target.into(),
            profile: None,
            validation_types: None,
            config,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_validation_types(mut self, types: Vec<String>) -> Self {
        self.validation_types = Some(types);
        self
    }

    /// Profile name the run will use
    pub fn profile_name(&self) -> String {
        self.profile
            .clone()
            .or_else(|| self.config.get_str("validation.profile").map(String::from))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }
}

/// Which reasoning backend a run uses
#[derive(Clone)]
pub enum BackendChoice {
    Mock,
    /// MCP server from `mcp.*`, falling back to mock on failure; built fresh per run
    Real,
    /// A caller-supplied backend, used as is
    Custom(Arc<dyn ReasoningBackend>),
}

/// Drives a single sequential validation run
pub struct SequentialOrchestrator {
    registry: Arc<ValidationStepRegistry>,
    backend: BackendChoice,
    machine: StateMachine,
}

impl SequentialOrchestrator {
    pub fn new(registry: Arc<ValidationStepRegistry>, backend: BackendChoice) -> Self {
        Self {
            registry,
            backend,
            machine: StateMachine::new(),
        }
    }

    /// Built-in command runners; mock reasoning when `use_mock`
    pub fn from_config(config: &ConfigStore, use_mock: bool) -> Self {
        let backend = if use_mock {
            BackendChoice::Mock
        } else {
            BackendChoice::Real
        };
        Self::new(
            Arc::new(ValidationStepRegistry::with_builtin_runners(config)),
            backend,
        )
    }

    pub fn state(&self) -> RunState {
        self.machine.state()
    }

    pub fn state_history(&self) -> &[RunState] {
        self.machine.history()
    }

    pub fn registry(&self) -> &ValidationStepRegistry {
        &self.registry
    }

    pub async fn run(&mut self, request: RunRequest) -> Result<AggregatedReport> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run; cancelling the token stops after the step in flight, keeping recorded results
    pub async fn run_with_cancel(
        &mut self,
        request: RunRequest,
        cancel: CancellationToken,
    ) -> Result<AggregatedReport> {
        self.machine = StateMachine::new();
        match self.drive(&request, &cancel).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.machine.fail();
                error!(kind = e.kind(), key = ?e.key(), error = %e, "Validation run failed");
                Err(e)
            }
        }
    }

    /// Build the plan a run would follow, without running any step
    pub async fn plan(&mut self, request: &RunRequest) -> Result<(Vec<String>, Vec<Thought>, BackendKind)> {
        let profile = ValidationProfile::new(&request.profile_name(), &request.config)?;
        let types = self.select_types(request, &profile)?;
        let backend = self.backend_for_run(&request.config, &profile);
        let mut plan = Plan::new(
            backend,
            request.prompt.clone(),
            plan_context(&types, &profile),
            max_steps(&request.config),
        );
        let thoughts = plan.drain().await?;
        let kind = plan.backend_kind();
        Ok((types, thoughts, kind))
    }

    async fn drive(&mut self, request: &RunRequest, cancel: &CancellationToken) -> Result<AggregatedReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let config = &request.config;

        self.machine.transition(RunState::Planning)?;
        let profile = ValidationProfile::new(&request.profile_name(), config)?;
        let selected = self.select_types(request, &profile)?;

        info!(
            run_id = %run_id,
            profile = %profile.name(),
            target = %request.target.display(),
            validation_types = ?selected,
            "Validation run started"
        );

        let backend = self.backend_for_run(config, &profile);
        let mut plan = Plan::new(
            backend,
            request.prompt.clone(),
            plan_context(&selected, &profile),
            max_steps(config),
        );
        let options = StepOptions {
            timeout: profile.timeout(),
            profile: profile.name().to_string(),
        };

        let mut results: BTreeMap<String, ReportEntry> = BTreeMap::new();
        let mut execution_order: Vec<String> = Vec::new();
        let mut abandoned: Vec<String> = Vec::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                next = plan.next() => next,
            };
            let thought = match next {
                Ok(Some(thought)) => thought,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Reasoning failed, ending plan");
                    break;
                }
            };
            self.machine.transition(RunState::Executing(thought.step_index))?;

            let remaining: Vec<&String> = selected
                .iter()
                .filter(|t| !results.contains_key(*t))
                .collect();
            let Some(validation_type) = resolve_thought_type(&thought, &remaining, &profile) else {
                debug!(step = thought.step_index, "Thought does not name a pending validation type");
                continue;
            };

            let required = profile.is_required(&validation_type);
            let result = if !step_enabled(&profile, &validation_type) {
                ValidationStepResult::skipped(&validation_type, "category disabled by profile")
            } else {
                let raw = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    raw = self.registry.run(&validation_type, &request.target, &options) => raw?,
                };
                let category = profile.categories().get(&validation_type);
                evaluate_result(raw, category, &profile)?
            };

            info!(
                step = thought.step_index,
                validation_type = %validation_type,
                status = %result.status,
                required,
                measured = ?result.measured_value,
                "Validation step recorded"
            );

            let failed_required = required && result.status != StepStatus::Passed;
            execution_order.push(validation_type.clone());
            results.insert(
                validation_type.clone(),
                ReportEntry {
                    result,
                    required,
                    step_index: Some(thought.step_index),
                },
            );

            if failed_required && profile.fail_fast() {
                abandoned = selected
                    .iter()
                    .filter(|t| !results.contains_key(*t))
                    .cloned()
                    .collect();
                info!(validation_type = %validation_type, abandoned = ?abandoned, "Fail-fast: abandoning remaining steps");
                plan.cancel();
                break;
            }
            if selected.iter().all(|t| results.contains_key(t)) {
                plan.cancel();
                break;
            }
        }
        if cancelled {
            plan.cancel();
            info!(run_id = %run_id, recorded = results.len(), "Validation run cancelled");
        }

        for validation_type in &selected {
            if results.contains_key(validation_type) || abandoned.contains(validation_type) {
                continue;
            }
            let reason = if cancelled {
                "run cancelled before this step"
            } else {
                "not reached by the reasoning plan"
            };
            results.insert(
                validation_type.clone(),
                ReportEntry {
                    result: ValidationStepResult::skipped(validation_type, reason),
                    required: profile.is_required(validation_type),
                    step_index: None,
                },
            );
        }

        self.machine.transition(RunState::Aggregating)?;
        let reasoning_backend_used = plan.backend_kind();
        let thoughts = plan.into_thoughts();
        let persist = config.get_bool("sequential_thinking.thought_persistence", true);
        if persist && let Some(path) = config.get_str("sequential_thinking.history_file") {
            append_history(Path::new(path), &run_id, &thoughts).await;
        }

        let overall_status = AggregatedReport::compute_status(&results);
        let report = AggregatedReport {
            run_id,
            prompt: request.prompt.clone(),
            target: request.target.clone(),
            profile: profile.name().to_string(),
            reasoning_backend_used,
            overall_status,
            results,
            execution_order,
            abandoned,
            thoughts: if persist { thoughts } else { Vec::new() },
            started_at,
            finished_at: Utc::now(),
            duration_ms: clock.elapsed().as_millis() as u64,
        };
        self.machine.transition(RunState::Done)?;

        info!(
            run_id = %report.run_id,
            status = ?report.overall_status,
            backend = %report.reasoning_backend_used,
            duration_ms = report.duration_ms,
            "Validation run finished"
        );
        Ok(report)
    }

    /// Explicit types (canonicalized), else prompt keywords, else enabled categories
    fn select_types(&self, request: &RunRequest, profile: &ValidationProfile) -> Result<Vec<String>> {
        let mut selected: Vec<String> = Vec::new();
        let candidates = match &request.validation_types {
            Some(explicit) if !explicit.is_empty() => {
                let mut names = Vec::with_capacity(explicit.len());
                for name in explicit {
                    let canonical = match profile.categories().get(name) {
                        Some(spec) => spec.name.clone(),
                        None if self.registry.contains(name) => name.clone(),
                        None => return Err(ValbotError::UnknownValidationType(name.clone())),
                    };
                    names.push(canonical);
                }
                names
            }
            _ => {
                let matched = profile.categories().match_prompt(&request.prompt);
                if matched.is_empty() {
                    debug!("No category named in prompt, using the profile's enabled categories");
                    profile.enabled_categories()
                } else {
                    matched
                }
            }
        };

        for name in candidates {
            if selected.contains(&name) {
                continue;
            }
            if step_enabled(profile, &name) && !self.registry.contains(&name) {
                return Err(ValbotError::UnknownValidationType(name));
            }
            selected.push(name);
        }
        Ok(selected)
    }

    fn backend_for_run(&self, config: &ConfigStore, profile: &ValidationProfile) -> Arc<dyn ReasoningBackend> {
        match &self.backend {
            BackendChoice::Mock => Arc::new(MockBackend::new()),
            BackendChoice::Real => reasoning::backend_for(config, false, profile.timeout()),
            BackendChoice::Custom(backend) => backend.clone(),
        }
    }
}

fn max_steps(config: &ConfigStore) -> usize {
    config.get_u64("sequential_thinking.max_steps", DEFAULT_MAX_STEPS) as usize
}

fn plan_context(types: &[String], profile: &ValidationProfile) -> PlanContext {
    PlanContext {
        validation_types: types.to_vec(),
        profile: profile.name().to_string(),
        thresholds: profile.thresholds().clone(),
    }
}

/// Pending validation type a thought refers to: its explicit field, else a keyword match
/// Profile categories follow their `enabled` flag; registered types outside
/// the category registry always run and are never required.
fn step_enabled(profile: &ValidationProfile, validation_type: &str) -> bool {
    profile.categories().get(validation_type).is_none() || profile.is_enabled(validation_type)
}

fn resolve_thought_type(
    thought: &Thought,
    remaining: &[&String],
    profile: &ValidationProfile,
) -> Option<String> {
    if let Some(named) = &thought.validation_type {
        let canonical = profile
            .categories()
            .get(named)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| named.clone());
        if remaining.iter().any(|t| **t == canonical) {
            return Some(canonical);
        }
    }
    remaining
        .iter()
        .find(|t| {
            profile
                .categories()
                .get(t)
                .is_some_and(|c| c.matches_text(&thought.content))
        })
        .map(|t| (*t).clone())
}

/// Derive the recorded status of a passed step from thresholds and issue tolerance
pub fn evaluate_result(
    result: ValidationStepResult,
    category: Option<&CategorySpec>,
    profile: &ValidationProfile,
) -> Result<ValidationStepResult> {
    if result.status != StepStatus::Passed {
        return Ok(result);
    }

    let mut unmet = Vec::new();
    if let Some(spec) = category {
        for name in &spec.thresholds {
            let measured = result.metrics.get(name).copied().or_else(|| {
                (spec.primary_threshold.as_deref() == Some(name.as_str()))
                    .then_some(result.measured_value)
                    .flatten()
            });
            let Some(measured) = measured else {
                // Secondary thresholds are optional; the primary one gates the step
                if spec.primary_threshold.as_deref() == Some(name.as_str()) {
                    unmet.push(format!("no measurement for {}", name));
                }
                continue;
            };
            if !profile.is_threshold_met(name, measured)? {
                let limit = profile.threshold(name)?;
                let comparator = profile
                    .threshold_registry()
                    .get(name)
                    .map(|s| s.comparator.to_string())
                    .unwrap_or_default();
                unmet.push(format!("{} {} (needs {} {})", name, measured, comparator, limit));
            }
        }
    }

    if !unmet.is_empty() {
        return Ok(result
            .with_status(StepStatus::Failed)
            .with_message(format!("threshold not met: {}", unmet.join("; "))));
    }
    if profile.should_fail_validation(&result.issues) {
        let count = result.issues.len();
        return Ok(result
            .with_status(StepStatus::Failed)
            .with_message(format!("{} issue(s) exceed the {} profile's tolerance", count, profile.name())));
    }
    Ok(result)
}

/// Append thoughts as JSON lines; failures are logged, never fatal
async fn append_history(path: &Path, run_id: &str, thoughts: &[Thought]) {
    let mut buf = String::new();
    for thought in thoughts {
        let line = json!({"run_id": run_id, "thought": thought});
        buf.push_str(&line.to_string());
        buf.push('\n');
    }
    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await;
    let outcome = match file {
        Ok(mut file) => file.write_all(buf.as_bytes()).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(()) => debug!(path = %path.display(), count = thoughts.len(), "Appended thought history"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write thought history"),
    }
}
