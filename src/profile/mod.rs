// src/profile/mod.rs
// Validation profiles: presets, categories and threshold directions

pub mod category;
pub mod presets;
pub mod threshold;
pub mod validation_profile;

pub use category::{CategoryRegistry, CategorySpec};
pub use presets::Preset;
pub use threshold::{Comparator, ThresholdRegistry, ThresholdSpec, normalize_name};
pub use validation_profile::{CategorySettings, ProfileName, ValidationProfile};
