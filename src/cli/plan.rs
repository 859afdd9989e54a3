// src/cli/plan.rs
// `plan` writes a plan document; `execute` runs one

use super::{GlobalArgs, apply_overrides, emit, load_config};
use super::run::execute_request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use valbot::reasoning::{BackendKind, Thought};
use valbot::{Result, RunRequest, SequentialOrchestrator};

/// Serialized output of `valbot plan`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub prompt: String,
    pub target: PathBuf,
    pub profile: String,
    pub validation_types: Vec<String>,
    pub thoughts: Vec<Thought>,
    pub backend: BackendKind,
    pub created_at: DateTime<Utc>,
}

impl PlanDocument {
    pub fn read(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

pub async fn run_plan(prompt: String, args: &GlobalArgs) -> Result<bool> {
    let config = load_config(args)?;
    let target = args.target.clone().unwrap_or_else(|| PathBuf::from("."));
    let request = apply_overrides(RunRequest::new(prompt, target, config.clone()), args);

    let mut orchestrator = SequentialOrchestrator::from_config(&config, args.mock_mcp);
    let (validation_types, thoughts, backend) = orchestrator.plan(&request).await?;
    let document = PlanDocument {
        profile: request.profile_name(),
        prompt: request.prompt,
        target: request.target,
        validation_types,
        thoughts,
        backend,
        created_at: Utc::now(),
    };
    emit(args.output.as_deref(), &serde_json::to_string_pretty(&document)?)?;
    Ok(true)
}

pub async fn run_execute(plan_file: PathBuf, args: &GlobalArgs) -> Result<bool> {
    let config = load_config(args)?;
    let document = PlanDocument::read(&plan_file)?;
    tracing::info!(
        plan = %plan_file.display(),
        profile = %document.profile,
        validation_types = ?document.validation_types,
        "Executing plan"
    );

    let target = args.target.clone().unwrap_or(document.target);
    let mut request = RunRequest::new(document.prompt, target, config.clone())
        .with_profile(document.profile);
    if !document.validation_types.is_empty() {
        request = request.with_validation_types(document.validation_types);
    }
    execute_request(apply_overrides(request, args), &config, args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_document_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let document = PlanDocument {
            prompt: "check test coverage".into(),
            target: PathBuf::from("./app"),
            profile: "standard".into(),
            validation_types: vec!["test".into()],
            thoughts: vec![Thought {
                step_index: 1,
                content: "Run the test suite".into(),
                next_step_needed: true,
                validation_type: Some("test".into()),
            }],
            backend: BackendKind::Mock,
            created_at: Utc::now(),
        };
        std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
        assert_eq!(PlanDocument::read(&path).unwrap(), document);
        assert!(PlanDocument::read(&dir.path().join("missing.json")).is_err());
    }
}
