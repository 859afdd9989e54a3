// src/main.rs
// valbot - validation bot command line

mod cli;

use clap::Parser;
use cli::{Cli, Commands, GlobalArgs};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use valbot::config::ConfigStore;
use valbot::ValbotError;

const EXIT_PASSED: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_FATAL: u8 = 2;

/// Log level from `--verbose` or `logging.level`
fn log_level(args: &GlobalArgs, config: Option<&ConfigStore>) -> Level {
    if args.verbose {
        return Level::DEBUG;
    }
    config
        .and_then(|c| c.get_str("logging.level"))
        .and_then(|l| Level::from_str(l).ok())
        .unwrap_or(Level::INFO)
}

/// Install the global subscriber, writing to `logging.file` when set
fn init_tracing(args: &GlobalArgs) -> anyhow::Result<()> {
    // Best effort: a broken config is reported by the command itself
    let config = cli::load_config(args).ok();
    let level = log_level(args, config.as_ref());
    let log_file = config
        .as_ref()
        .and_then(|c| c.get_str("logging.file"))
        .map(std::path::PathBuf::from);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn report_fatal(err: &ValbotError) {
    match err.key() {
        Some(key) => eprintln!("error: {} [{}]: {}", err.kind(), key, err),
        None => eprintln!("error: {}: {}", err.kind(), err),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env files (global first, then working directory - working directory overrides)
    if let Some(home) = dirs::home_dir() {
        let _ = dotenvy::from_path(home.join(".valbot/.env"));
    }
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.global) {
        eprintln!("error: failed to initialize logging: {}", e);
        return ExitCode::from(EXIT_FATAL);
    }

    let outcome = match cli.command {
        Commands::Run { prompt } => cli::run_prompt(prompt, &cli.global).await,
        Commands::Plan { prompt } => cli::run_plan(prompt, &cli.global).await,
        Commands::Execute { plan_file } => cli::run_execute(plan_file, &cli.global).await,
        Commands::Validate { path } => cli::run_validate(path, &cli.global).await,
    };

    match outcome {
        Ok(true) => ExitCode::from(EXIT_PASSED),
        Ok(false) => ExitCode::from(EXIT_FAILED),
        Err(e) => {
            report_fatal(&e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_level() {
        let mut args = GlobalArgs::default();
        assert_eq!(log_level(&args, None), Level::INFO);

        let mut config = ConfigStore::with_defaults();
        config.set("logging.level", json!("warn")).unwrap();
        assert_eq!(log_level(&args, Some(&config)), Level::WARN);

        args.verbose = true;
        assert_eq!(log_level(&args, Some(&config)), Level::DEBUG);
    }
}
