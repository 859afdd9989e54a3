// src/reasoning/fallback.rs
// Primary backend with a one-way downgrade to the mock backend

use super::backend::{BackendKind, ReasoningBackend, Thought, ThoughtRequest};
use super::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Wraps a primary backend; the first failure switches to mock for the rest of the run
pub struct FallbackBackend {
    primary: Arc<dyn ReasoningBackend>,
    mock: MockBackend,
    fell_back: AtomicBool,
}

impl FallbackBackend {
    pub fn new(primary: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            primary,
            mock: MockBackend::new(),
            fell_back: AtomicBool::new(false),
        }
    }

    pub fn has_fallen_back(&self) -> bool {
        self.fell_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningBackend for FallbackBackend {
    async fn think(&self, request: &ThoughtRequest) -> Result<Thought> {
        if self.has_fallen_back() {
            return self.mock.think(request).await;
        }
        match self.primary.think(request).await {
            Ok(thought) => Ok(thought),
            Err(e) => {
                warn!(
                    error = %e,
                    step = request.step_index,
                    "Reasoning backend failed, falling back to mock for the rest of the run"
                );
                self.fell_back.store(true, Ordering::SeqCst);
                self.mock.think(request).await
            }
        }
    }

    fn kind(&self) -> BackendKind {
        if self.has_fallen_back() {
            BackendKind::Mock
        } else {
            self.primary.kind()
        }
    }
}
