// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads the TOML file, deserializes the raw tables and converts them into a
//! validated runtime [`Config`].

use log::Level;
use std::{fs, path::Path};

use super::model::{Config, ConfigError, RawConfig};
use crate::rules_log;

/// Load and validate the configuration at `path`.
/// Logs at DEBUG before reading and INFO on success.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    rules_log!(Level::Debug, "config", "reading config from {:?}", path);
    let txt = fs::read_to_string(path)?;
    let cfg: Config = txt.parse()?;
    rules_log!(
        Level::Info,
        "config",
        "loaded config from {:?}: dispatch={:?}, {} signature filter(s)",
        path,
        cfg.engine.dispatch,
        cfg.engine.signatures.len()
    );
    Ok(cfg)
}

/// `load`, or defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load(path)
    } else {
        rules_log!(Level::Warn, "config", "{:?} not found, using defaults", path);
        Config::try_from(RawConfig::default())
    }
}
