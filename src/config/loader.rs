// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "Pvtrigger.toml";

/// Read and deserialize a config file. Missing sections take their defaults;
/// no range checks happen here.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    debug!(?path, bytes = text.len(), "read config file");

    Ok(toml::from_str(&text)?)
}

/// [`load_from_path`] followed by validation into a [`ConfigFile`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let config = ConfigFile::try_from(load_from_path(path)?)?;

    info!(
        ?path,
        task = %config.trigger.task_name,
        source = config.trigger.source_name.as_deref().unwrap_or("<from store>"),
        "loaded config"
    );
    Ok(config)
}
