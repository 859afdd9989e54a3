// src/validation/registry.rs
// Registry mapping validation-type names to step runners

use super::result::ValidationStepResult;
use super::runners;
use crate::config::ConfigStore;
use crate::error::{Result, ValbotError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Per-call options handed to a runner
#[derive(Debug, Clone)]
pub struct StepOptions {
    pub timeout: Duration,
    pub profile: String,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            profile: crate::config::defaults::DEFAULT_PROFILE.to_string(),
        }
    }
}

/// Executes one external check against a target path
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(&self, target: &Path, options: &StepOptions) -> anyhow::Result<ValidationStepResult>;
}

/// Adapter turning an async closure into a [`StepRunner`]
pub struct FnRunner<F>(F);

impl<F> FnRunner<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> StepRunner for FnRunner<F>
where
    F: Fn(PathBuf, StepOptions) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ValidationStepResult>> + Send + 'static,
{
    async fn run(&self, target: &Path, options: &StepOptions) -> anyhow::Result<ValidationStepResult> {
        (self.0)(target.to_path_buf(), options.clone()).await
    }
}

/// Named step runners, in registration order
#[derive(Default, Clone)]
pub struct ValidationStepRegistry {
    runners: HashMap<String, Arc<dyn StepRunner>>,
    order: Vec<String>,
}

impl ValidationStepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with command runners for the built-in categories
    pub fn with_builtin_runners(config: &ConfigStore) -> Self {
        let mut registry = Self::new();
        for (name, runner) in runners::builtin_runners(config) {
            registry.register(name, runner);
        }
        registry
    }

    /// Register (or replace) the runner for a validation type
    pub fn register(&mut self, validation_type: impl Into<String>, runner: Arc<dyn StepRunner>) {
        let name = validation_type.into();
        if self.runners.insert(name.clone(), runner).is_none() {
            self.order.push(name);
        }
    }

    pub fn contains(&self, validation_type: &str) -> bool {
        self.runners.contains_key(validation_type)
    }

    pub fn registered_types(&self) -> &[String] {
        &self.order
    }

    /// Run a registered check under `options.timeout`.
    ///
    /// Runner failures and timeouts come back as `status = error` results;
    /// only an unregistered type is an `Err`.
    pub async fn run(
        &self,
        validation_type: &str,
        target: &Path,
        options: &StepOptions,
    ) -> Result<ValidationStepResult> {
        let runner = self
            .runners
            .get(validation_type)
            .ok_or_else(|| ValbotError::UnknownValidationType(validation_type.to_string()))?;

        debug!(validation_type, target = %target.display(), "Running validation step");
        let start = Instant::now();
        let outcome = tokio::time::timeout(options.timeout, runner.run(target, options)).await;
        let elapsed = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(mut result)) => {
                result.validation_type = validation_type.to_string();
                if result.duration_ms == 0 {
                    result.duration_ms = elapsed;
                }
                result
            }
            Ok(Err(e)) => {
                warn!(validation_type, error = %e, "Validation step failed to run");
                ValidationStepResult::error(validation_type, format!("{:#}", e)).with_duration_ms(elapsed)
            }
            Err(_) => {
                warn!(
                    validation_type,
                    timeout_secs = options.timeout.as_secs(),
                    "Validation step timed out"
                );
                ValidationStepResult::error(
                    validation_type,
                    format!("timed out after {}s", options.timeout.as_secs()),
                )
                .with_duration_ms(elapsed)
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::StepStatus;

    fn fixed(result: ValidationStepResult) -> Arc<dyn StepRunner> {
        Arc::new(FnRunner::new(move |_target: PathBuf, _opts: StepOptions| {
            let result = result.clone();
            async move { Ok::<_, anyhow::Error>(result) }
        }))
    }

    #[tokio::test]
    async fn test_run_registered() {
        let mut registry = ValidationStepRegistry::new();
        registry.register("test", fixed(ValidationStepResult::passed("anything").with_measured(75.0)));
        let result = registry
            .run("test", Path::new("."), &StepOptions::default())
            .await
            .unwrap();
        assert_eq!(result.validation_type, "test");
        assert_eq!(result.measured_value, Some(75.0));
        assert!(registry.contains("test"));
        assert_eq!(registry.registered_types(), ["test".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_type_is_error() {
        let registry = ValidationStepRegistry::new();
        let err = registry
            .run("docs", Path::new("."), &StepOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownValidationTypeError");
    }

    #[tokio::test]
    async fn test_runner_error_becomes_error_status() {
        let mut registry = ValidationStepRegistry::new();
        registry.register(
            "security",
            Arc::new(FnRunner::new(|_t: PathBuf, _o: StepOptions| async {
                Err::<ValidationStepResult, _>(anyhow::anyhow!("bandit not installed"))
            })),
        );
        let result = registry
            .run("security", Path::new("."), &StepOptions::default())
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Error);
        assert!(result.message.unwrap().contains("bandit not installed"));
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_status() {
        let mut registry = ValidationStepRegistry::new();
        registry.register(
            "performance",
            Arc::new(FnRunner::new(|_t: PathBuf, _o: StepOptions| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, anyhow::Error>(ValidationStepResult::passed("performance"))
            })),
        );
        let options = StepOptions {
            timeout: Duration::from_millis(20),
            ..StepOptions::default()
        };
        let result = registry
            .run("performance", Path::new("."), &options)
            .await
            .unwrap();
        assert_eq!(result.status, StepStatus::Error);
        assert!(result.message.unwrap().contains("timed out"));
    }

    #[test]
    fn test_register_replaces_keeps_order() {
        let mut registry = ValidationStepRegistry::new();
        registry.register("test", fixed(ValidationStepResult::passed("test")));
        registry.register("code_quality", fixed(ValidationStepResult::passed("code_quality")));
        registry.register("test", fixed(ValidationStepResult::failed("test")));
        assert_eq!(registry.registered_types(), ["test".to_string(), "code_quality".to_string()]);
    }

    #[test]
    fn test_builtin_runners() {
        let registry = ValidationStepRegistry::with_builtin_runners(&ConfigStore::with_defaults());
        for name in ["test", "code_quality", "type_check", "security", "performance"] {
            assert!(registry.contains(name), "missing {}", name);
        }
    }
}
