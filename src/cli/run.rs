// src/cli/run.rs
// `run` and `validate` commands, with optional continuous mode

use super::{GlobalArgs, apply_overrides, emit_report, load_config};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use valbot::config::ConfigStore;
use valbot::config::defaults::DEFAULT_CONTINUOUS_INTERVAL_SECS;
use valbot::{Result, RunRequest, SequentialOrchestrator};

/// Validate according to a prompt. Returns whether the run passed.
pub async fn run_prompt(prompt: String, args: &GlobalArgs) -> Result<bool> {
    let config = load_config(args)?;
    let target = args.target.clone().unwrap_or_else(|| PathBuf::from("."));
    let request = apply_overrides(RunRequest::new(prompt, target, config.clone()), args);
    execute_request(request, &config, args).await
}

/// Validate a path with the profile's categories (or `--validation-types`)
pub async fn run_validate(path: PathBuf, args: &GlobalArgs) -> Result<bool> {
    let config = load_config(args)?;
    let prompt = format!("Validate {}", path.display());
    let request = apply_overrides(RunRequest::new(prompt, path, config.clone()), args);
    execute_request(request, &config, args).await
}

/// Run once, or repeatedly with `--continuous-validation`
pub async fn execute_request(request: RunRequest, config: &ConfigStore, args: &GlobalArgs) -> Result<bool> {
    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current step");
            watcher.cancel();
        }
    });

    if !args.continuous_validation {
        let mut orchestrator = SequentialOrchestrator::from_config(config, args.mock_mcp);
        let report = orchestrator.run_with_cancel(request, cancel).await?;
        emit_report(&report, config, args.output.as_deref())?;
        return Ok(report.passed());
    }

    let interval = Duration::from_secs(config.get_u64(
        "validation.continuous_interval",
        DEFAULT_CONTINUOUS_INTERVAL_SECS,
    ));
    info!(interval_secs = interval.as_secs(), "Continuous validation started");

    let mut passed = false;
    let mut pass = 0u64;
    loop {
        pass += 1;
        // Fresh orchestrator per pass so a reasoning fallback does not outlive its run
        let mut orchestrator = SequentialOrchestrator::from_config(config, args.mock_mcp);
        match orchestrator.run_with_cancel(request.clone(), cancel.clone()).await {
            Ok(report) => {
                passed = report.passed();
                emit_report(&report, config, args.output.as_deref())?;
                info!(pass, passed, "Continuous validation pass finished");
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(pass, error = %e, "Continuous validation pass failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!(passes = pass, "Continuous validation stopped");
    Ok(passed)
}
