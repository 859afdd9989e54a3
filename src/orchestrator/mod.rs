// src/orchestrator/mod.rs
// Sequential orchestration of validation runs

pub mod engine;
pub mod report;
pub mod state;

pub use engine::{BackendChoice, RunRequest, SequentialOrchestrator, evaluate_result};
pub use report::{AggregatedReport, OverallStatus, ReportEntry, ReportFormat};
pub use state::{RunState, StateMachine};
