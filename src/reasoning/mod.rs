// src/reasoning/mod.rs
// Reasoning backends: mock, MCP sequential thinking, and the fallback wrapper

pub mod backend;
pub mod decompose;
pub mod fallback;
pub mod mcp;
pub mod mock;

pub use backend::{BackendKind, Plan, PlanContext, ReasoningBackend, Thought, ThoughtRequest};
pub use fallback::FallbackBackend;
pub use mcp::{McpBackend, McpServerConfig};
pub use mock::MockBackend;

use crate::config::ConfigStore;
use std::sync::Arc;
use std::time::Duration;

/// Build the backend for a run: mock when requested or when
/// `sequential_thinking.enabled` is false, otherwise MCP behind a fallback
pub fn backend_for(config: &ConfigStore, use_mock: bool, timeout: Duration) -> Arc<dyn ReasoningBackend> {
    if use_mock || !config.get_bool("sequential_thinking.enabled", true) {
        return Arc::new(MockBackend::new());
    }
    let real = McpBackend::new(McpServerConfig::from_config(config, timeout));
    Arc::new(FallbackBackend::new(Arc::new(real)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_selection() {
        let config = ConfigStore::with_defaults();
        let timeout = Duration::from_secs(1);
        assert_eq!(backend_for(&config, true, timeout).kind(), BackendKind::Mock);
        assert_eq!(backend_for(&config, false, timeout).kind(), BackendKind::Real);

        let mut disabled = config.clone();
        disabled.set("sequential_thinking.enabled", json!(false)).unwrap();
        assert_eq!(backend_for(&disabled, false, timeout).kind(), BackendKind::Mock);
    }
}
