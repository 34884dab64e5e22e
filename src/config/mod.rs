// src/config/mod.rs

//! Workflow configuration: TOML model, loading and validation.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_and_validate_with, parse_and_validate, parse_raw};
pub use model::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile};
