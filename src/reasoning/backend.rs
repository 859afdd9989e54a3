// src/reasoning/backend.rs
// ReasoningBackend trait, thought types and the lazy Plan sequence

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which backend actually produced thoughts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Mock,
    Real,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Real => "real",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reasoning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// 1-based position in the plan
    pub step_index: usize,
    pub content: String,
    pub next_step_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_type: Option<String>,
}

/// What the plan is about: requested types, active profile and its thresholds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanContext {
    pub validation_types: Vec<String>,
    pub profile: String,
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
}

/// Input to a single `think` call
#[derive(Debug, Clone)]
pub struct ThoughtRequest {
    pub prompt: String,
    pub context: PlanContext,
    pub step_index: usize,
    pub total_steps: usize,
    pub history: Vec<Thought>,
}

/// Produces the next thought of a plan
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn think(&self, request: &ThoughtRequest) -> Result<Thought>;

    /// Kind of backend answering requests right now
    fn kind(&self) -> BackendKind;
}

/// Lazy, finite sequence of thoughts for one prompt.
///
/// Ends when a thought reports `next_step_needed = false`, when `max_steps`
/// thoughts have been produced, or after [`Plan::cancel`].
pub struct Plan {
    backend: Arc<dyn ReasoningBackend>,
    prompt: String,
    context: PlanContext,
    max_steps: usize,
    produced: Vec<Thought>,
    finished: bool,
}

impl Plan {
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        prompt: impl Into<String>,
        context: PlanContext,
        max_steps: usize,
    ) -> Self {
        Self {
            backend,
            prompt: prompt.into(),
            context,
            max_steps: max_steps.max(1),
            produced: Vec::new(),
            finished: false,
        }
    }

    /// Expected plan length: one step per validation type plus synthesis
    pub fn total_steps(&self) -> usize {
        (self.context.validation_types.len() + 1).min(self.max_steps)
    }

    /// Next thought, or `None` once the plan is over
    pub async fn next(&mut self) -> Result<Option<Thought>> {
        if self.finished || self.produced.len() >= self.max_steps {
            self.finished = true;
            return Ok(None);
        }

        let step_index = self.produced.len() + 1;
        let request = ThoughtRequest {
            prompt: self.prompt.clone(),
            context: self.context.clone(),
            step_index,
            total_steps: self.total_steps().max(step_index),
            history: self.produced.clone(),
        };

        let mut thought = match self.backend.think(&request).await {
            Ok(thought) => thought,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };
        thought.step_index = step_index;
        if !thought.next_step_needed || step_index >= self.max_steps {
            self.finished = true;
        }

        debug!(
            step = step_index,
            validation_type = ?thought.validation_type,
            next_step_needed = thought.next_step_needed,
            "Produced thought"
        );
        self.produced.push(thought.clone());
        Ok(Some(thought))
    }

    /// Abandon the rest of the plan; produced thoughts stay valid
    pub fn cancel(&mut self) {
        if !self.finished {
            debug!(produced = self.produced.len(), "Plan cancelled");
        }
        self.finished = true;
    }

    /// Collect all remaining thoughts
    pub async fn drain(&mut self) -> Result<Vec<Thought>> {
        let mut rest = Vec::new();
        while let Some(thought) = self.next().await? {
            rest.push(thought);
        }
        Ok(rest)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn thoughts(&self) -> &[Thought] {
        &self.produced
    }

    pub fn into_thoughts(self) -> Vec<Thought> {
        self.produced
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }
}
