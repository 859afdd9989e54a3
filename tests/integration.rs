//! End-to-end runs through configuration, profiles, reasoning and the orchestrator

mod test_utils;

use serde_json::json;
use std::sync::Arc;
use test_utils::*;
use valbot::ConfigStore;
use valbot::orchestrator::{BackendChoice, OverallStatus, RunRequest, RunState, SequentialOrchestrator};
use valbot::profile::ValidationProfile;
use valbot::reasoning::{BackendKind, FallbackBackend};
use valbot::validation::StepStatus;

const COVERAGE_PROMPT: &str = "Please validate my test coverage";

// ============================================================================
// Full runs
// ============================================================================

#[tokio::test]
async fn test_standard_coverage_run_passes() {
    let mut orch = SequentialOrchestrator::new(stub_registry(5.0), BackendChoice::Mock);
    let report = orch
        .run(RunRequest::new(COVERAGE_PROMPT, "./app", ConfigStore::with_defaults()))
        .await
        .unwrap();

    assert_eq!(report.profile, "standard");
    assert_eq!(report.execution_order, vec!["test"]);
    assert_eq!(report.status_of("test"), Some(StepStatus::Passed));
    assert_eq!(report.overall_status, OverallStatus::Passed);
    assert_eq!(report.reasoning_backend_used, BackendKind::Mock);
    assert_eq!(orch.state(), RunState::Done);
}

#[tokio::test]
async fn test_strict_coverage_run_fails() {
    let mut orch = SequentialOrchestrator::new(stub_registry(5.0), BackendChoice::Mock);
    let report = orch
        .run(RunRequest::new(COVERAGE_PROMPT, "./app", ConfigStore::with_defaults()).with_profile("strict"))
        .await
        .unwrap();

    assert_eq!(report.status_of("test"), Some(StepStatus::Failed));
    assert_eq!(report.overall_status, OverallStatus::Failed);
}

#[tokio::test]
async fn test_failing_category_without_fail_fast_records_every_step() {
    // complexity 12 is over the standard limit of 10
    let mut orch = SequentialOrchestrator::new(stub_registry(12.0), BackendChoice::Mock);
    let request = RunRequest::new("check everything", "./app", ConfigStore::with_defaults())
        .with_validation_types(vec!["code_quality".into(), "test".into(), "type_check".into()]);
    let report = orch.run(request).await.unwrap();

    assert_eq!(report.status_of("code_quality"), Some(StepStatus::Failed));
    assert_eq!(report.status_of("test"), Some(StepStatus::Passed));
    assert_eq!(report.status_of("type_check"), Some(StepStatus::Passed));
    assert!(report.abandoned.is_empty());
    assert_eq!(report.overall_status, OverallStatus::Failed);
}

#[tokio::test]
async fn test_unreachable_reasoning_server_falls_back_to_mock() {
    let primary = Arc::new(UnreachableBackend::default());
    let backend = Arc::new(FallbackBackend::new(primary.clone()));
    let mut orch = SequentialOrchestrator::new(stub_registry(5.0), BackendChoice::Custom(backend.clone()));
    let report = orch
        .run(RunRequest::new(COVERAGE_PROMPT, "./app", ConfigStore::with_defaults()))
        .await
        .unwrap();

    assert!(backend.has_fallen_back());
    assert_eq!(primary.calls(), 1);
    assert_eq!(report.reasoning_backend_used, BackendKind::Mock);
    assert_eq!(report.status_of("test"), Some(StepStatus::Passed));

    let rendered = report.render(valbot::orchestrator::ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["reasoning_backend_used"], json!("mock"));
}

#[tokio::test]
async fn test_custom_profile_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "valbot.yaml",
        "validation:\n  profile: custom\n  custom_profile:\n    test_coverage_threshold: 80\n",
    );
    let config = config_from_files(&[file]);

    let mut orch = SequentialOrchestrator::new(stub_registry(5.0), BackendChoice::Mock);
    let report = orch
        .run(RunRequest::new(COVERAGE_PROMPT, "./app", config))
        .await
        .unwrap();
    assert_eq!(report.profile, "custom");
    assert_eq!(report.status_of("test"), Some(StepStatus::Failed));
}

// ============================================================================
// Configuration layering
// ============================================================================

#[test]
fn test_files_merge_left_to_right_then_environment() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(
        dir.path(),
        "a.yaml",
        "validation:\n  profile: strict\n  timeout: 30\nagents:\n  test_validation:\n    coverage_threshold: 60\n",
    );
    let b = write_file(
        dir.path(),
        "b.json",
        r#"{"validation": {"profile": "minimal"}, "agents": {"test_validation": {"coverage_threshold": 65}}}"#,
    );
    let mut config = config_from_files(&[a, b]);

    assert_eq!(config.get_str("validation.profile"), Some("minimal"));
    assert_eq!(config.get_u64("validation.timeout", 0), 30);
    // Untouched defaults survive the merge
    assert_eq!(config.get_str("validation.report_format"), Some("json"));

    let applied = config.apply_overrides_from(
        "VALBOT_",
        vec![(
            "VALBOT_AGENTS_TEST_VALIDATION_COVERAGE_THRESHOLD".to_string(),
            "80".to_string(),
        )],
    );
    assert_eq!(applied, 1);
    assert_eq!(config.get_f64("agents.test_validation.coverage_threshold", 0.0), 80.0);
}

#[test]
fn test_environment_beats_file_for_profile_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(
        dir.path(),
        "valbot.yaml",
        "agents:\n  test_validation:\n    coverage_threshold: 70\n",
    );
    let mut config = config_from_files(&[file]);
    let profile = ValidationProfile::new("standard", &config).unwrap();
    assert!(profile.is_threshold_met("test_coverage", 75.0).unwrap());

    config.apply_overrides_from(
        "VALBOT_",
        vec![(
            "VALBOT_AGENTS_TEST_VALIDATION_COVERAGE_THRESHOLD".to_string(),
            "80".to_string(),
        )],
    );
    let profile = ValidationProfile::new("standard", &config).unwrap();
    assert!(!profile.is_threshold_met("test_coverage", 75.0).unwrap());
}

#[test]
fn test_absent_key_default_and_error() {
    let config = ConfigStore::with_defaults();
    assert_eq!(
        config.get("validation.not_a_key", Some(json!("fallback"))).unwrap(),
        json!("fallback")
    );
    let err = config.get("validation.not_a_key", None).unwrap_err();
    assert_eq!(err.key().as_deref(), Some("validation.not_a_key"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ConfigStore::with_defaults();
    let err = config
        .load(&[valbot::config::ConfigSource::File(dir.path().join("nope.yaml"))])
        .unwrap_err();
    assert!(err.is_fatal());
}
