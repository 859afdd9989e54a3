// src/cli/mod.rs
// CLI module for valbot commands

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use valbot::orchestrator::{AggregatedReport, ReportFormat};
use valbot::{ConfigOptions, ConfigStore, Result, RunRequest};

pub mod plan;
pub mod run;

pub use plan::{run_execute, run_plan};
pub use run::{run_prompt, run_validate};

#[derive(Parser)]
#[command(name = "valbot")]
#[command(about = "Validation bot: profile-gated test, lint, type, security and performance checks")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Validation profile (strict, standard, minimal, custom)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Comma-separated validation types (e.g. test,code_quality)
    #[arg(long, global = true, value_delimiter = ',')]
    pub validation_types: Option<Vec<String>>,

    /// Path to validate (default: current directory)
    #[arg(long, global = true)]
    pub target: Option<PathBuf>,

    /// Configuration file or directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the built-in mock reasoning backend instead of the MCP server
    #[arg(long, global = true)]
    pub mock_mcp: bool,

    /// Re-run validation on an interval until interrupted
    #[arg(long, global = true)]
    pub continuous_validation: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write the report (or plan) to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate according to a natural-language prompt
    Run {
        /// What to validate (e.g. "Please validate my test coverage")
        #[arg(index = 1)]
        prompt: String,
    },

    /// Produce a reasoning plan without running any validation
    Plan {
        #[arg(index = 1)]
        prompt: String,
    },

    /// Run a plan previously written by `plan`
    Execute {
        /// Plan document (JSON)
        #[arg(index = 1)]
        plan_file: PathBuf,
    },

    /// Validate a path with the profile's enabled categories
    Validate {
        #[arg(index = 1)]
        path: PathBuf,
    },
}

/// Resolve configuration: defaults, ~/.valbot/config.*, --config, environment
pub fn load_config(args: &GlobalArgs) -> Result<ConfigStore> {
    ConfigStore::resolve(&ConfigOptions {
        config_path: args.config.clone(),
        env_prefix: None,
        include_user_config: true,
    })
}

/// Apply the CLI overrides shared by every command to a request
pub fn apply_overrides(mut request: RunRequest, args: &GlobalArgs) -> RunRequest {
    if let Some(profile) = &args.profile {
        request = request.with_profile(profile.clone());
    }
    if let Some(types) = &args.validation_types {
        let types: Vec<String> = types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !types.is_empty() {
            request = request.with_validation_types(types);
        }
    }
    request
}

pub fn report_format(config: &ConfigStore) -> ReportFormat {
    config
        .get_str("validation.report_format")
        .and_then(ReportFormat::from_str)
        .unwrap_or_default()
}

/// Write text to `--output` or stdout
pub fn emit(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            tracing::info!(path = %path.display(), "Wrote output");
        }
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}

pub fn emit_report(report: &AggregatedReport, config: &ConfigStore, output: Option<&Path>) -> Result<()> {
    emit(output, &report.render(report_format(config))?)
}
