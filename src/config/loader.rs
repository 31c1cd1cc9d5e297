// src/config/loader.rs

use std::path::Path;

use tracing::{debug, info};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Looked up in the working directory unless `--config` says otherwise.
pub const DEFAULT_CONFIG_FILE: &str = "Backstage.toml";

/// Read and deserialize `path` without semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&text)?)
}

/// Read `path` and validate it into a [`ConfigFile`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let config = ConfigFile::try_from(load_from_path(path)?)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// [`load_and_validate`], except that a missing file means "all defaults".
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if path.exists() {
        return load_and_validate(path);
    }
    debug!(path = %path.display(), "no config file; using defaults");
    ConfigFile::try_from(RawConfigFile::default())
}
