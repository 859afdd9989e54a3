// src/config/mod.rs
// Layered configuration: built-in defaults, config files, environment overrides

pub mod defaults;
pub mod env;
pub mod file;
pub mod store;

pub use env::{EnvOverride, KeyResolution, coerce_value};
pub use store::{ConfigOptions, ConfigSource, ConfigStore, ENV_PREFIX, deep_merge};
