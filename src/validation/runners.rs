// src/validation/runners.rs
// Built-in command runners wrapping pytest, flake8, mypy, bandit and a benchmark command

use super::registry::{StepOptions, StepRunner};
use super::result::{Issue, Severity, StepStatus, ValidationStepResult};
use crate::config::ConfigStore;
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tracing::debug;

/// Placeholder replaced by the target path in command arguments
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

type OutputParser = fn(&CommandOutput) -> ValidationStepResult;

/// Runs an external command and parses its output into a step result
pub struct CommandRunner {
    validation_type: String,
    command: Vec<String>,
    parser: OutputParser,
}

impl CommandRunner {
    pub fn new(validation_type: &str, command: Vec<String>, parser: OutputParser) -> Self {
        Self {
            validation_type: validation_type.to_string(),
            command,
            parser,
        }
    }

    /// Command line with `{target}` substituted
    pub fn command_line(&self, target: &Path) -> Vec<String> {
        let target = target.display().to_string();
        self.command
            .iter()
            .map(|arg| arg.replace(TARGET_PLACEHOLDER, &target))
            .collect()
    }

    async fn execute(&self, target: &Path) -> anyhow::Result<CommandOutput> {
        let argv = self.command_line(target);
        let (program, args) = argv
            .split_first()
            .context("validation command is empty")?;

        debug!(validation_type = %self.validation_type, command = ?argv, "Spawning validation command");
        let start = Instant::now();
        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", program))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn raw_output(&self, target: &Path, output: &CommandOutput) -> Value {
        json!({
            "command": self.command_line(target),
            "exit_code": output.exit_code,
            "stdout": output.stdout,
            "stderr": output.stderr,
        })
    }
}

#[async_trait]
impl StepRunner for CommandRunner {
    async fn run(&self, target: &Path, _options: &StepOptions) -> anyhow::Result<ValidationStepResult> {
        let output = self.execute(target).await?;
        let raw = self.raw_output(target, &output);
        let result = match output.exit_code {
            Some(_) => (self.parser)(&output),
            None => ValidationStepResult::error(&self.validation_type, "process terminated abnormally"),
        };
        Ok(result
            .with_raw_output(raw)
            .with_duration_ms(output.elapsed_ms))
    }
}

/// Runs a benchmark command several times and reports mean wall time
pub struct BenchmarkRunner {
    inner: CommandRunner,
    iterations: u64,
}

impl BenchmarkRunner {
    pub fn new(command: Vec<String>, iterations: u64) -> Self {
        Self {
            inner: CommandRunner::new("performance", command, parse_benchmark),
            iterations: iterations.max(1),
        }
    }
}

#[async_trait]
impl StepRunner for BenchmarkRunner {
    async fn run(&self, target: &Path, _options: &StepOptions) -> anyhow::Result<ValidationStepResult> {
        let mut timings = Vec::with_capacity(self.iterations as usize);
        let mut last = CommandOutput::default();
        for _ in 0..self.iterations {
            let output = self.inner.execute(target).await?;
            match output.exit_code {
                Some(0) => timings.push(output.elapsed_ms as f64),
                Some(_) => {
                    let raw = self.inner.raw_output(target, &output);
                    return Ok(parse_benchmark(&output).with_raw_output(raw));
                }
                None => {
                    return Ok(ValidationStepResult::error("performance", "benchmark terminated abnormally"));
                }
            }
            last = output;
        }
        let mean = timings.iter().sum::<f64>() / timings.len() as f64;
        let raw = self.inner.raw_output(target, &last);
        Ok(ValidationStepResult::passed("performance")
            .with_measured(mean)
            .with_metric("wall_time_ms", mean)
            .with_metric("iterations", timings.len() as f64)
            .with_raw_output(raw))
    }
}

/// Command for a category: `agents.<key>.command` (list or string) or the default
fn configured_command(config: &ConfigStore, config_key: &str, default: &[&str]) -> Vec<String> {
    match config.lookup(&format!("agents.{}.command", config_key)) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        Some(Value::String(s)) => s.split_whitespace().map(String::from).collect(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// Runners for the built-in categories, keyed by category name
pub fn builtin_runners(config: &ConfigStore) -> Vec<(String, Arc<dyn StepRunner>)> {
    let iterations = config.get_u64("agents.performance.benchmark_iterations", 3);
    vec![
        (
            "test".to_string(),
            Arc::new(CommandRunner::new(
                "test",
                configured_command(
                    config,
                    "test_validation",
                    &["pytest", "--cov={target}", "--cov-report=term", "-q", "{target}"],
                ),
                parse_pytest,
            )) as Arc<dyn StepRunner>,
        ),
        (
            "code_quality".to_string(),
            Arc::new(CommandRunner::new(
                "code_quality",
                configured_command(config, "code_quality", &["flake8", "--max-complexity=1", "{target}"]),
                parse_flake8,
            )),
        ),
        (
            "type_check".to_string(),
            Arc::new(CommandRunner::new(
                "type_check",
                configured_command(config, "type_check", &["mypy", "{target}"]),
                parse_mypy,
            )),
        ),
        (
            "security".to_string(),
            Arc::new(CommandRunner::new(
                "security",
                configured_command(config, "security", &["bandit", "-r", "-f", "json", "-q", "{target}"]),
                parse_bandit,
            )),
        ),
        (
            "performance".to_string(),
            Arc::new(BenchmarkRunner::new(
                configured_command(
                    config,
                    "performance",
                    &["pytest", "--benchmark-only", "-q", "{target}"],
                ),
                iterations,
            )),
        ),
    ]
}

// ============================================================================
// Output parsers
// ============================================================================

/// Status from an exit code where 0 is clean and 1 means findings
fn status_for(exit_code: Option<i32>) -> Option<StepStatus> {
    match exit_code {
        Some(0) => Some(StepStatus::Passed),
        Some(1) => Some(StepStatus::Failed),
        _ => None,
    }
}

fn tool_error(validation_type: &str, output: &CommandOutput) -> ValidationStepResult {
    let detail = output.stderr.lines().last().unwrap_or("").trim();
    let message = match output.exit_code {
        Some(code) if detail.is_empty() => format!("exited with status {}", code),
        Some(code) => format!("exited with status {}: {}", code, detail),
        None => "process terminated abnormally".to_string(),
    };
    ValidationStepResult::error(validation_type, message)
}

/// Coverage table row: `name stmts miss [branch brpart] cover% [missing]`
static COVERAGE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\S+)\s+\d+\s+\d+(?:\s+\d+\s+\d+)?\s+(?P<pct>\d+(?:\.\d+)?)%")
        .expect("valid regex")
});
static TEST_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) (passed|failed)\b").expect("valid regex"));
static FLAKE8_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>[^:]+):(?P<line>\d+):\d+: (?P<code>[A-Z]+\d+) (?P<msg>.*)$")
        .expect("valid regex")
});
static TOO_COMPLEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"too complex \((\d+)\)").expect("valid regex"));

/// Total coverage percentage. coverage.py omits the `TOTAL` row when a
/// single file is measured; that file's row is the total then.
fn coverage_total(stdout: &str) -> Option<f64> {
    let mut total = None;
    let mut last_row = None;
    for caps in stdout.lines().filter_map(|l| COVERAGE_ROW.captures(l.trim_end())) {
        let Ok(pct) = caps["pct"].parse::<f64>() else {
            continue;
        };
        if &caps["name"] == "TOTAL" {
            total = Some(pct);
        } else {
            last_row = Some(pct);
        }
    }
    total.or(last_row)
}

/// Parse pytest + pytest-cov terminal output
pub fn parse_pytest(output: &CommandOutput) -> ValidationStepResult {
    let Some(status) = status_for(output.exit_code) else {
        return tool_error("test", output);
    };
    let mut result = ValidationStepResult::new("test", status);

    if let Some(coverage) = coverage_total(&output.stdout) {
        result = result
            .with_measured(coverage)
            .with_metric("test_coverage", coverage);
    }

    // Summary line, e.g. "3 failed, 12 passed in 0.52s"
    if let Some(line) = output
        .stdout
        .lines()
        .rev()
        .find(|l| TEST_COUNT.is_match(l))
    {
        for caps in TEST_COUNT.captures_iter(line) {
            let Ok(n) = caps[1].parse::<f64>() else {
                continue;
            };
            let metric = if &caps[2] == "passed" {
                "tests_passed"
            } else {
                "tests_failed"
            };
            result = result.with_metric(metric, n);
        }
    }

    for test in output.stdout.lines().filter_map(|l| l.strip_prefix("FAILED ")) {
        result = result.with_issue(Issue::new(format!("test failed: {}", test.trim()), Severity::Error));
    }
    result
}

/// Parse flake8 `path:line:col: CODE message` lines
pub fn parse_flake8(output: &CommandOutput) -> ValidationStepResult {
    if status_for(output.exit_code).is_none() {
        return tool_error("code_quality", output);
    }

    let mut errors = 0u32;
    let mut warnings = 0u32;
    let mut complexity = 0f64;
    let mut issues = Vec::new();

    for caps in output.stdout.lines().filter_map(|l| FLAKE8_LINE.captures(l)) {
        let code = &caps["code"];
        let message = &caps["msg"];

        if code == "C901" {
            if let Some(value) = TOO_COMPLEX
                .captures(message)
                .and_then(|c| c[1].parse::<f64>().ok())
            {
                complexity = complexity.max(value);
            }
            continue;
        }

        let severity = if code.starts_with('E') || code.starts_with('F') {
            errors += 1;
            Severity::Error
        } else {
            warnings += 1;
            Severity::Warning
        };
        issues.push(
            Issue::new(format!("{} {}", code, message), severity)
                .at(format!("{}:{}", &caps["file"], &caps["line"])),
        );
    }

    let mut result = ValidationStepResult::passed("code_quality")
        .with_measured(complexity)
        .with_metric("complexity", complexity)
        .with_metric("lint_error", errors as f64)
        .with_metric("lint_warning", warnings as f64);
    result.issues = issues;
    result
}

/// Parse mypy output, counting `error:` lines
pub fn parse_mypy(output: &CommandOutput) -> ValidationStepResult {
    if status_for(output.exit_code).is_none() {
        return tool_error("type_check", output);
    }
    let mut result = ValidationStepResult::passed("type_check");
    let mut count = 0u32;
    for line in output.stdout.lines().filter(|l| l.contains(": error:")) {
        count += 1;
        let (location, message) = line.split_once(": error:").unwrap_or((line, ""));
        result = result.with_issue(Issue::new(message.trim(), Severity::Error).at(location));
    }
    let status = if count > 0 {
        StepStatus::Failed
    } else {
        StepStatus::Passed
    };
    result
        .with_status(status)
        .with_measured(count as f64)
        .with_metric("type_errors", count as f64)
}

#[derive(Deserialize)]
struct BanditReport {
    #[serde(default)]
    results: Vec<BanditFinding>,
}

#[derive(Deserialize)]
struct BanditFinding {
    issue_severity: String,
    issue_text: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    line_number: u32,
}

/// Parse bandit JSON output; any HIGH severity finding fails the step
pub fn parse_bandit(output: &CommandOutput) -> ValidationStepResult {
    if status_for(output.exit_code).is_none() {
        return tool_error("security", output);
    }
    let report: BanditReport = match serde_json::from_str(&output.stdout) {
        Ok(report) => report,
        Err(e) => {
            return ValidationStepResult::error("security", format!("unreadable bandit report: {}", e));
        }
    };

    let mut high = 0u32;
    let mut result = ValidationStepResult::passed("security");
    for finding in &report.results {
        let severity = match finding.issue_severity.to_uppercase().as_str() {
            "HIGH" => {
                high += 1;
                Severity::Error
            }
            "MEDIUM" => Severity::Warning,
            _ => Severity::Info,
        };
        result = result.with_issue(
            Issue::new(&finding.issue_text, severity)
                .at(format!("{}:{}", finding.filename, finding.line_number)),
        );
    }
    let status = if high > 0 {
        StepStatus::Failed
    } else {
        StepStatus::Passed
    };
    result
        .with_status(status)
        .with_measured(report.results.len() as f64)
        .with_metric("security_issues", report.results.len() as f64)
        .with_metric("high_severity", high as f64)
}

/// Single benchmark pass; a non-zero exit fails the step
fn parse_benchmark(output: &CommandOutput) -> ValidationStepResult {
    match output.exit_code {
        Some(0) => ValidationStepResult::passed("performance")
            .with_measured(output.elapsed_ms as f64)
            .with_metric("wall_time_ms", output.elapsed_ms as f64),
        _ => tool_error("performance", output).with_status(StepStatus::Failed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output(stdout: &str, exit_code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: Some(exit_code),
            elapsed_ms: 5,
        }
    }

    // ========================================================================
    // Parsers
    // ========================================================================

    #[test]
    fn test_parse_pytest_coverage() {
        let stdout = "\
---------- coverage: platform linux, python 3.11 ----------
Name            Stmts   Miss  Cover
-----------------------------------
app/main.py        40      8    80%
TOTAL              60     15    75%

12 passed in 0.41s
";
        let result = parse_pytest(&output(stdout, 0));
        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(result.measured_value, Some(75.0));
        assert_eq!(result.metrics["test_coverage"], 75.0);
        assert_eq!(result.metrics["tests_passed"], 12.0);
    }

    #[test]
    fn test_parse_pytest_single_file_coverage() {
        // No TOTAL row when only one file is measured
        let stdout = "\
Name      Stmts   Miss  Cover   Missing
---------------------------------------
calc.py      40     38     5%   3-40

3 passed in 0.02s
";
        let result = parse_pytest(&output(stdout, 0));
        assert_eq!(result.measured_value, Some(5.0));
        assert_eq!(result.metrics["test_coverage"], 5.0);
        assert_eq!(result.metrics["tests_passed"], 3.0);
    }

    #[test]
    fn test_parse_pytest_failures() {
        let stdout = "\
FAILED tests/test_app.py::test_add - assert 3 == 4
==== 1 failed, 4 passed in 0.10s ====
";
        let result = parse_pytest(&output(stdout, 1));
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.metrics["tests_failed"], 1.0);
        assert_eq!(result.metrics["tests_passed"], 4.0);
        assert_eq!(result.error_count(), 1);
        assert!(result.measured_value.is_none());
    }

    #[test]
    fn test_parse_pytest_usage_error() {
        let mut out = output("", 4);
        out.stderr = "ERROR: file or directory not found: nope\n".to_string();
        let result = parse_pytest(&out);
        assert_eq!(result.status, StepStatus::Error);
        assert!(result.message.unwrap().contains("not found"));
    }

    #[test]
    fn test_parse_flake8() {
        let stdout = "\
app/main.py:3:1: F401 'os' imported but unused
app/main.py:10:80: E501 line too long (95 > 79 characters)
app/main.py:12:1: W391 blank line at end of file
app/main.py:20:1: C901 'handler' is too complex (12)
app/util.py:4:1: C901 'helper' is too complex (3)
";
        let result = parse_flake8(&output(stdout, 1));
        assert_eq!(result.status, StepStatus::Passed);
        assert_eq!(result.metrics["lint_error"], 2.0);
        assert_eq!(result.metrics["lint_warning"], 1.0);
        assert_eq!(result.metrics["complexity"], 12.0);
        assert_eq!(result.issues.len(), 3);
        assert_eq!(result.issues[0].location.as_deref(), Some("app/main.py:3"));
    }

    #[test]
    fn test_parse_mypy() {
        let stdout = "\
app/main.py:5: error: Incompatible return value type (got \"int\", expected \"str\")
app/main.py:9: note: See https://mypy.readthedocs.io
Found 1 error in 1 file (checked 2 source files)
";
        let result = parse_mypy(&output(stdout, 1));
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.metrics["type_errors"], 1.0);
        assert_eq!(result.issues[0].location.as_deref(), Some("app/main.py:5"));

        let clean = parse_mypy(&output("Success: no issues found in 2 source files\n", 0));
        assert_eq!(clean.status, StepStatus::Passed);
    }

    #[test]
    fn test_parse_bandit() {
        let report = json!({
            "results": [
                {"issue_severity": "HIGH", "issue_text": "Use of exec", "filename": "app/main.py", "line_number": 7},
                {"issue_severity": "LOW", "issue_text": "assert used", "filename": "app/main.py", "line_number": 9}
            ]
        });
        let result = parse_bandit(&output(&report.to_string(), 1));
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.metrics["security_issues"], 2.0);
        assert_eq!(result.metrics["high_severity"], 1.0);

        let low_only = json!({"results": [{"issue_severity": "LOW", "issue_text": "assert used"}]});
        assert!(parse_bandit(&output(&low_only.to_string(), 1)).is_passed());

        let garbage = parse_bandit(&output("not json", 0));
        assert_eq!(garbage.status, StepStatus::Error);
    }

    // ========================================================================
    // Commands
    // ========================================================================

    #[test]
    fn test_configured_command_override() {
        let config = ConfigStore::from_value(json!({
            "agents": {
                "type_check": {"command": ["pyright", "{target}"]},
                "security": {"command": "semgrep --config auto {target}"}
            }
        }));
        assert_eq!(
            configured_command(&config, "type_check", &["mypy"]),
            vec!["pyright", "{target}"]
        );
        assert_eq!(
            configured_command(&config, "security", &["bandit"]),
            vec!["semgrep", "--config", "auto", "{target}"]
        );
        assert_eq!(configured_command(&config, "code_quality", &["flake8"]), vec!["flake8"]);
    }

    #[test]
    fn test_target_placeholder() {
        let runner = CommandRunner::new(
            "test",
            vec!["pytest".into(), "--cov={target}".into(), "{target}".into()],
            parse_pytest,
        );
        assert_eq!(
            runner.command_line(Path::new("src/app")),
            vec!["pytest", "--cov=src/app", "src/app"]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_err() {
        let runner = CommandRunner::new("test", vec!["valbot-no-such-tool-xyz".into()], parse_pytest);
        let err = runner
            .run(Path::new("."), &StepOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_runner_parses_output() {
        let runner = CommandRunner::new(
            "type_check",
            vec![
                "sh".into(),
                "-c".into(),
                "echo 'a.py:1: error: boom'; exit 1".into(),
            ],
            parse_mypy,
        );
        let result = runner.run(Path::new("."), &StepOptions::default()).await.unwrap();
        assert_eq!(result.status, StepStatus::Failed);
        assert_eq!(result.raw_output["exit_code"], json!(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_benchmark_runner_mean() {
        let runner = BenchmarkRunner::new(vec!["true".into()], 2);
        let result = runner.run(Path::new("."), &StepOptions::default()).await.unwrap();
        assert!(result.is_passed());
        assert_eq!(result.metrics["iterations"], 2.0);

        let failing = BenchmarkRunner::new(vec!["false".into()], 3);
        let result = failing.run(Path::new("."), &StepOptions::default()).await.unwrap();
        assert_eq!(result.status, StepStatus::Failed);
    }
}
