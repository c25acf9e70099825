// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PvTriggerError {
    /// The monitored value could not be resolved or connected at subscribe time.
    #[error("Source unavailable: '{name}': {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// The decision callback failed while processing a change event.
    #[error("Callback failed in task '{task}': {source}")]
    CallbackFailure {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    /// The orchestrator rejected a workflow launch.
    #[error("Failed to launch workflow '{workflow}': {source}")]
    DispatchFailure {
        workflow: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PvTriggerError>;
