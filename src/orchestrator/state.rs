// src/orchestrator/state.rs
// Run state machine

use crate::error::{Result, ValbotError};
use serde::Serialize;
use std::fmt;

/// Lifecycle of one validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Planning,
    /// Executing the plan step with this 1-based index
    Executing(usize),
    Aggregating,
    Done,
    Failed,
}

impl RunState {
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        match (*self, next) {
            (Idle, Planning) => true,
            (Planning, Executing(_)) | (Planning, Aggregating) => true,
            (Executing(current), Executing(step)) => step > current,
            (Executing(_), Aggregating) => true,
            (Aggregating, Done) => true,
            (Done, _) | (Failed, _) => false,
            (_, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Planning => write!(f, "planning"),
            Self::Executing(step) => write!(f, "executing({})", step),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Current state plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: RunState,
    history: Vec<RunState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn transition(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(ValbotError::Other(format!(
                "illegal state transition {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` unless already terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = RunState::Failed;
            self.history.push(RunState::Failed);
        }
    }
}
