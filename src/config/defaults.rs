// src/config/defaults.rs
// Built-in default configuration tree (lowest precedence layer)

use serde_json::{Map, Value, json};

/// Profile used when neither a file nor the environment picks one
pub const DEFAULT_PROFILE: &str = "standard";

/// Default upper bound on reasoning steps per plan
pub const DEFAULT_MAX_STEPS: u64 = 10;

/// Default interval between continuous validation passes
pub const DEFAULT_CONTINUOUS_INTERVAL_SECS: u64 = 30;

/// Default MCP server for sequential thinking
pub const DEFAULT_MCP_COMMAND: &str = "npx";
pub const DEFAULT_MCP_PACKAGE: &str = "@modelcontextprotocol/server-sequential-thinking";
pub const DEFAULT_MCP_TOOL: &str = "sequentialthinking";

/// Build the default configuration tree.
///
/// Threshold values and the `enabled` flag of profile-gated categories
/// (type_check, security, performance) are `null`: the active profile
/// supplies them unless a file or the environment sets them. The keys
/// are present so `VALBOT_*` variables resolve onto them.
pub fn default_tree() -> Map<String, Value> {
    let tree = json!({
        "validation": {
            "profile": DEFAULT_PROFILE,
            "test_frameworks": ["pytest", "unittest"],
            "linters": ["flake8", "pylint"],
            "type_checkers": ["mypy"],
            "report_format": "json",
            "fail_fast": false,
            "custom_profile": {
                "test_coverage_threshold": null,
                "complexity_threshold": null,
                "lint_error_threshold": null,
                "lint_warning_threshold": null,
                "fail_on_any_issue": null,
                "type_check_required": null,
                "security_scan_required": null,
                "performance_check_required": null
            }
        },
        "agents": {
            "test_validation": {
                "enabled": true,
                "result_analysis": true,
                "coverage_threshold": null
            },
            "code_quality": {
                "enabled": true,
                "style_check": true,
                "complexity_threshold": null,
                "lint_error_threshold": null,
                "lint_warning_threshold": null
            },
            "type_check": {
                "enabled": null
            },
            "performance": {
                "enabled": null,
                "benchmark_iterations": 3
            },
            "security": {
                "enabled": null,
                "vulnerability_scan": true,
                "dependency_check": true
            }
        },
        "sequential_thinking": {
            "enabled": true,
            "max_steps": DEFAULT_MAX_STEPS,
            "thought_persistence": true
        },
        "model": {
            "id": "gpt-4o",
            "temperature": 0.2,
            "max_tokens": 4096
        },
        "mcp": {
            "command": DEFAULT_MCP_COMMAND,
            "args": ["-y", DEFAULT_MCP_PACKAGE],
            "tool": DEFAULT_MCP_TOOL
        },
        "logging": {
            "level": "INFO",
            "file": null,
            "format": "full"
        }
    });

    match tree {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
