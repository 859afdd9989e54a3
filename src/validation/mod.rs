// src/validation/mod.rs
// Validation steps: result model, runner registry and built-in tool runners

pub mod registry;
pub mod result;
pub mod runners;

pub use registry::{FnRunner, StepOptions, StepRunner, ValidationStepRegistry};
pub use result::{Issue, Severity, StepStatus, ValidationStepResult};
pub use runners::{BenchmarkRunner, CommandOutput, CommandRunner};
