// src/reasoning/mcp.rs
// Real reasoning backend: a sequential-thinking MCP server over stdio

use super::backend::{BackendKind, ReasoningBackend, Thought, ThoughtRequest};
use super::decompose::draft_step;
use crate::config::ConfigStore;
use crate::config::defaults::{DEFAULT_MCP_COMMAND, DEFAULT_MCP_PACKAGE, DEFAULT_MCP_TOOL};
use crate::error::{Result, ValbotError};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, ClientInfo};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::{RoleClient, serve_client};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How to launch the sequential-thinking server
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub tool: String,
    /// Bound on connecting plus one tool call
    pub timeout: Duration,
}

impl McpServerConfig {
    /// Read `mcp.command`, `mcp.args`, `mcp.env` and `mcp.tool`
    pub fn from_config(config: &ConfigStore, timeout: Duration) -> Self {
        let command = config
            .get_str("mcp.command")
            .unwrap_or(DEFAULT_MCP_COMMAND)
            .to_string();
        let args = config
            .lookup("mcp.args")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|| vec!["-y".to_string(), DEFAULT_MCP_PACKAGE.to_string()]);
        let env = config
            .lookup("mcp.env")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| match v {
                        Value::String(s) => Some((k.clone(), s.clone())),
                        Value::Null => None,
                        other => Some((k.clone(), other.to_string())),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let tool = config
            .get_str("mcp.tool")
            .unwrap_or(DEFAULT_MCP_TOOL)
            .to_string();

        Self {
            command,
            args,
            env,
            tool,
            timeout,
        }
    }
}

/// A live connection; dropping it shuts the transport down and kills the child
struct Connection {
    peer: Peer<RoleClient>,
    _service: RunningService<RoleClient, ClientInfo>,
}

/// Server reply to a `sequentialthinking` call
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingResponse {
    next_thought_needed: Option<bool>,
    thought: Option<String>,
}

/// Reasoning backend talking to an MCP server, spawned on first use
pub struct McpBackend {
    config: McpServerConfig,
    connection: Mutex<Option<Connection>>,
}

impl McpBackend {
    pub fn new(config: McpServerConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Connection> {
        let env_keys: Vec<&str> = self.config.env.keys().map(|k| k.as_str()).collect();
        info!(
            command = %self.config.command,
            args = ?self.config.args,
            env_vars = ?env_keys,
            "Spawning sequential thinking MCP server"
        );

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args);
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            ValbotError::Reasoning(format!(
                "failed to spawn MCP server '{}': {}",
                self.config.command, e
            ))
        })?;

        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: rmcp::model::Implementation {
                name: "valbot".into(),
                title: Some("Validation Bot".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
        };

        let service = serve_client(client_info, transport)
            .await
            .map_err(|e| ValbotError::Reasoning(format!("failed to initialize MCP client: {}", e)))?;
        let peer = service.peer().clone();

        Ok(Connection {
            peer,
            _service: service,
        })
    }

    /// Call the thinking tool, connecting first if needed
    async fn call(&self, args: Value) -> Result<String> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(connection) = guard.as_ref() else {
            return Err(ValbotError::Reasoning("MCP server not connected".into()));
        };

        let arguments = match args {
            Value::Object(map) => Some(map),
            _ => None,
        };
        let tool_name: std::borrow::Cow<'static, str> = self.config.tool.clone().into();

        debug!(tool = %self.config.tool, "Calling MCP tool");
        let result: CallToolResult = connection
            .peer
            .call_tool(CallToolRequestParams {
                meta: None,
                name: tool_name,
                arguments,
                task: None,
            })
            .await
            .map_err(|e| ValbotError::Reasoning(format!("MCP tool call failed: {}", e)))?;

        let text: String = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.to_string()))
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error == Some(true) {
            return Err(ValbotError::Reasoning(format!("MCP tool reported an error: {}", text)));
        }
        Ok(text)
    }

    /// Drop the connection, stopping the server process
    pub async fn shutdown(&self) {
        if self.connection.lock().await.take().is_some() {
            info!("Disconnected from sequential thinking MCP server");
        }
    }
}

fn parse_response(text: &str) -> Result<ThinkingResponse> {
    serde_json::from_str(text.trim())
        .map_err(|e| ValbotError::Reasoning(format!("unexpected MCP response: {}", e)))
}

#[async_trait]
impl ReasoningBackend for McpBackend {
    async fn think(&self, request: &ThoughtRequest) -> Result<Thought> {
        let draft = draft_step(request);
        let args = json!({
            "thought": draft.content,
            "thoughtNumber": request.step_index,
            "totalThoughts": request.total_steps,
            "nextThoughtNeeded": draft.next_step_needed,
        });

        let text = tokio::time::timeout(self.config.timeout, self.call(args))
            .await
            .map_err(|_| ValbotError::Timeout(self.config.timeout.as_secs()))??;
        let response = parse_response(&text)?;

        Ok(Thought {
            step_index: request.step_index,
            content: response.thought.unwrap_or(draft.content),
            next_step_needed: response.next_thought_needed.unwrap_or(draft.next_step_needed),
            validation_type: draft.validation_type,
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Real
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::PlanContext;

    #[test]
    fn test_config_defaults() {
        let config = McpServerConfig::from_config(&ConfigStore::new(), Duration::from_secs(60));
        assert_eq!(config.command, "npx");
        assert_eq!(config.args, vec!["-y", DEFAULT_MCP_PACKAGE]);
        assert_eq!(config.tool, "sequentialthinking");
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_config_from_tree() {
        let store = ConfigStore::from_value(json!({
            "mcp": {
                "command": "node",
                "args": ["server.js"],
                "env": {"DISABLE_THOUGHT_LOGGING": "true", "PORT": 8080},
                "tool": "think"
            }
        }));
        let config = McpServerConfig::from_config(&store, Duration::from_secs(5));
        assert_eq!(config.command, "node");
        assert_eq!(config.args, vec!["server.js"]);
        assert_eq!(config.env.get("PORT").unwrap(), "8080");
        assert_eq!(config.tool, "think");
    }

    #[test]
    fn test_parse_response() {
        let response = parse_response(
            r#"{"thoughtNumber": 1, "totalThoughts": 3, "nextThoughtNeeded": false, "thoughtHistoryLength": 1}"#,
        )
        .unwrap();
        assert_eq!(response.next_thought_needed, Some(false));
        assert!(response.thought.is_none());
        assert!(parse_response("not json").is_err());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reasoning_error() {
        let backend = McpBackend::new(McpServerConfig {
            command: "valbot-no-such-mcp-server".into(),
            args: Vec::new(),
            env: HashMap::new(),
            tool: DEFAULT_MCP_TOOL.into(),
            timeout: Duration::from_secs(5),
        });
        let request = ThoughtRequest {
            prompt: "test".into(),
            context: PlanContext::default(),
            step_index: 1,
            total_steps: 1,
            history: Vec::new(),
        };
        let err = backend.think(&request).await.unwrap_err();
        assert_eq!(err.kind(), "ReasoningError");
        assert_eq!(backend.kind(), BackendKind::Real);
    }
}
