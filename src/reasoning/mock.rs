// src/reasoning/mock.rs
// Deterministic in-process reasoning backend

use super::backend::{BackendKind, ReasoningBackend, Thought, ThoughtRequest};
use super::decompose::draft_step;
use crate::error::Result;
use async_trait::async_trait;

/// Rule-based backend: the same request always yields the same thought
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReasoningBackend for MockBackend {
    async fn think(&self, request: &ThoughtRequest) -> Result<Thought> {
        Ok(draft_step(request))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }
}
