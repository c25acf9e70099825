// src/config/mod.rs

//! Configuration loading and validation for the `pvtrigger` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a [`ConfigFile`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, DEFAULT_CONFIG_FILE};
pub use model::{
    ActionSection, ConfigFile, RawConfigFile, RawSimulateSection, RawTriggerSection,
    SimulateSection, TriggerSection, PVNAME_KEY,
};
