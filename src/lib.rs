// src/lib.rs
// valbot - profile-gated validation runs driven by sequential reasoning

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod reasoning;
pub mod validation;

pub use config::{ConfigOptions, ConfigStore};
pub use error::{Result, ValbotError};
pub use orchestrator::{AggregatedReport, RunRequest, SequentialOrchestrator};
pub use profile::ValidationProfile;
pub use reasoning::ReasoningBackend;
pub use validation::ValidationStepRegistry;
