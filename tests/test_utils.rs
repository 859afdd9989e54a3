//! Test utilities for valbot integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use valbot::ConfigStore;
use valbot::config::ConfigSource;
use valbot::reasoning::{BackendKind, ReasoningBackend, Thought, ThoughtRequest};
use valbot::validation::{FnRunner, StepOptions, StepRunner, ValidationStepRegistry, ValidationStepResult};
use valbot::{Result, ValbotError};

/// Runner that always returns `result`
pub fn fixed_runner(result: ValidationStepResult) -> Arc<dyn StepRunner> {
    Arc::new(FnRunner::new(move |_target: PathBuf, _options: StepOptions| {
        let result = result.clone();
        async move { Ok::<_, anyhow::Error>(result) }
    }))
}

/// Registry with a stub runner per built-in category.
///
/// `test` reports 75% coverage; `code_quality` reports `complexity`.
pub fn stub_registry(complexity: f64) -> Arc<ValidationStepRegistry> {
    let mut registry = ValidationStepRegistry::new();
    registry.register(
        "test",
        fixed_runner(
            ValidationStepResult::passed("test")
                .with_measured(75.0)
                .with_metric("test_coverage", 75.0),
        ),
    );
    registry.register(
        "code_quality",
        fixed_runner(
            ValidationStepResult::passed("code_quality")
                .with_metric("complexity", complexity)
                .with_metric("lint_error", 0.0)
                .with_metric("lint_warning", 0.0),
        ),
    );
    registry.register("type_check", fixed_runner(ValidationStepResult::passed("type_check")));
    registry.register("security", fixed_runner(ValidationStepResult::passed("security")));
    registry.register("performance", fixed_runner(ValidationStepResult::passed("performance")));
    Arc::new(registry)
}

/// Real-kind backend whose every call fails, like an unreachable MCP server
#[derive(Default)]
pub struct UnreachableBackend {
    calls: AtomicUsize,
}

impl UnreachableBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for UnreachableBackend {
    async fn think(&self, _request: &ThoughtRequest) -> Result<Thought> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ValbotError::Reasoning("connection refused".into()))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Real
    }
}

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Defaults merged with each file, left to right
pub fn config_from_files(files: &[PathBuf]) -> ConfigStore {
    let mut config = ConfigStore::with_defaults();
    let sources: Vec<ConfigSource> = files.iter().cloned().map(ConfigSource::File).collect();
    config.load(&sources).unwrap();
    config
}
