// src/config/model.rs

use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;

use crate::engine::{DispatchMode, EngineConfig};

/// Top-level runtime config
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub input:   InputConfig,
    pub engine:  EngineSettings,
    pub output:  OutputConfig,
    /// `None` when `[metrics] enable = false`
    pub metrics: Option<MetricsConfig>,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]                   pub enable: bool,
    #[serde(default)]                   pub file:   Option<String>,
    #[serde(default = "default_level")] pub level:  String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[input]` table: `key:value` listener options
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_input")] pub options: Vec<String>,
}
fn default_input() -> Vec<String> { vec!["file:stdin".into(), "format:json".into()] }

impl Default for InputConfig {
    fn default() -> Self {
        Self { options: default_input() }
    }
}

/// Fully-typed `[engine]` table
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub dispatch:       DispatchMode,
    pub event_capacity: usize,
    pub sink_capacity:  usize,
    pub worker_queue:   usize,
    /// Signature IDs to load; empty loads everything.
    pub signatures:     Vec<String>,
}

impl EngineSettings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig { mode: self.dispatch, worker_queue: self.worker_queue }
    }
}

/// Fully-typed `[output]` table
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub stdout:         bool,
    pub database:       Option<PathBuf>,
    pub flush_interval: Duration,
    pub batch_size:     usize,
}

/// Fully-typed `[metrics]` table
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub listen:           SocketAddr,
    pub publish_interval: Duration,
}

/// Holds the raw `[engine]` entries from TOML
#[derive(Debug, Deserialize)]
pub struct EngineStub {
    #[serde(default = "default_dispatch")]       pub dispatch:       String,
    #[serde(default = "default_event_capacity")] pub event_capacity: usize,
    #[serde(default = "default_sink_capacity")]  pub sink_capacity:  usize,
    #[serde(default = "default_worker_queue")]   pub worker_queue:   usize,
    #[serde(default)]                            pub signatures:     Vec<String>,
}
fn default_dispatch() -> String { "sequential".into() }
fn default_event_capacity() -> usize { 10_000 }
fn default_sink_capacity() -> usize { 1_000 }
fn default_worker_queue() -> usize { 1_024 }

/// Holds the raw `[output]` entries from TOML
#[derive(Debug, Deserialize)]
pub struct OutputStub {
    #[serde(default = "default_true")]           pub stdout:            bool,
    #[serde(default)]                            pub database:          Option<String>,
    #[serde(default = "default_flush_interval")] pub flush_interval_ms: u64,
    #[serde(default = "default_batch_size")]     pub batch_size:        usize,
}
fn default_true() -> bool { true }
fn default_flush_interval() -> u64 { 250 }
fn default_batch_size() -> usize { 1_000 }

/// Holds the raw `[metrics]` entries from TOML
#[derive(Debug, Deserialize)]
pub struct MetricsStub {
    #[serde(default)]                             pub enable:           bool,
    #[serde(default = "default_listen")]          pub listen:           String,
    #[serde(default = "default_publish_interval")] pub publish_interval: String,
}
fn default_listen() -> String { "127.0.0.1:3366".into() }
fn default_publish_interval() -> String { "5s".into() }

/// Whole file as written
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)] pub logging: LoggingConfig,
    #[serde(default)] pub input:   InputConfig,
    #[serde(default)] pub engine:  Option<EngineStub>,
    #[serde(default)] pub output:  Option<OutputStub>,
    #[serde(default)] pub metrics: Option<MetricsStub>,
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid dispatch mode '{0}' (expected 'sequential' or 'per-signature')")]
    InvalidDispatch(String),

    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("invalid listen address '{0}': {1}")]
    InvalidListen(String, #[source] std::net::AddrParseError),

    #[error("'{0}' must be greater than zero")]
    Zero(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Allow `"per-signature"` → `DispatchMode::PerSignature`
impl FromStr for DispatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "sequential"    => Ok(DispatchMode::Sequential),
            "per-signature" => Ok(DispatchMode::PerSignature),
            other           => Err(ConfigError::InvalidDispatch(other.into())),
        }
    }
}

fn non_zero(value: usize, name: &'static str) -> Result<usize, ConfigError> {
    if value == 0 { Err(ConfigError::Zero(name)) } else { Ok(value) }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let engine = raw.engine.unwrap_or_else(|| EngineStub {
            dispatch:       default_dispatch(),
            event_capacity: default_event_capacity(),
            sink_capacity:  default_sink_capacity(),
            worker_queue:   default_worker_queue(),
            signatures:     Vec::new(),
        });
        let engine = EngineSettings {
            dispatch:       engine.dispatch.parse()?,
            event_capacity: non_zero(engine.event_capacity, "engine.event_capacity")?,
            sink_capacity:  non_zero(engine.sink_capacity, "engine.sink_capacity")?,
            worker_queue:   non_zero(engine.worker_queue, "engine.worker_queue")?,
            signatures:     engine.signatures,
        };

        let output = raw.output.unwrap_or_else(|| OutputStub {
            stdout:            true,
            database:          None,
            flush_interval_ms: default_flush_interval(),
            batch_size:        default_batch_size(),
        });
        if output.flush_interval_ms == 0 {
            return Err(ConfigError::Zero("output.flush_interval_ms"));
        }
        let output = OutputConfig {
            stdout:         output.stdout,
            database:       output.database.map(PathBuf::from),
            flush_interval: Duration::from_millis(output.flush_interval_ms),
            batch_size:     non_zero(output.batch_size, "output.batch_size")?,
        };

        let metrics = match raw.metrics {
            Some(m) if m.enable => {
                let listen = m.listen.parse().map_err(|e| ConfigError::InvalidListen(m.listen.clone(), e))?;
                let publish_interval = humantime::parse_duration(&m.publish_interval)
                    .map_err(|e| ConfigError::InvalidDuration(m.publish_interval.clone(), e))?;
                if publish_interval.is_zero() {
                    return Err(ConfigError::Zero("metrics.publish_interval"));
                }
                Some(MetricsConfig { listen, publish_interval })
            }
            _ => None,
        };

        Ok(Config { logging: raw.logging, input: raw.input, engine, output, metrics })
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawConfig = toml::from_str(s)?;
        Config::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = "".parse().unwrap();
        assert_eq!(cfg.engine.dispatch, DispatchMode::Sequential);
        assert_eq!(cfg.input.options, vec!["file:stdin", "format:json"]);
        assert!(cfg.output.stdout);
        assert!(cfg.output.database.is_none());
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.logging.level, "INFO");
    }

    #[test]
    fn full_file() {
        let cfg: Config = r#"
            [logging]
            enable = true
            file = "rules.log"
            level = "debug"

            [input]
            options = ["file:/var/log/events.jsonl", "format:json"]

            [engine]
            dispatch = "per-signature"
            event_capacity = 64
            sink_capacity = 8
            signatures = ["TRC-107"]

            [output]
            stdout = false
            database = "findings.db"
            flush_interval_ms = 100
            batch_size = 50

            [metrics]
            enable = true
            listen = "0.0.0.0:9090"
            publish_interval = "2s 500ms"
        "#
        .parse()
        .unwrap();

        assert_eq!(cfg.engine.dispatch, DispatchMode::PerSignature);
        assert_eq!(cfg.engine.event_capacity, 64);
        assert_eq!(cfg.engine.signatures, vec!["TRC-107"]);
        assert_eq!(cfg.output.database, Some(PathBuf::from("findings.db")));
        assert_eq!(cfg.output.flush_interval, Duration::from_millis(100));
        let metrics = cfg.metrics.unwrap();
        assert_eq!(metrics.listen.port(), 9090);
        assert_eq!(metrics.publish_interval, Duration::from_millis(2_500));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_mode = "[engine]\ndispatch = \"parallel\"".parse::<Config>();
        assert!(matches!(bad_mode, Err(ConfigError::InvalidDispatch(m)) if m == "parallel"));

        let zero = "[engine]\nsink_capacity = 0".parse::<Config>();
        assert!(matches!(zero, Err(ConfigError::Zero("engine.sink_capacity"))));

        let bad_interval = "[metrics]\nenable = true\npublish_interval = \"soon\"".parse::<Config>();
        assert!(matches!(bad_interval, Err(ConfigError::InvalidDuration(..))));

        let bad_listen = "[metrics]\nenable = true\nlisten = \"localhost\"".parse::<Config>();
        assert!(matches!(bad_listen, Err(ConfigError::InvalidListen(..))));
    }
}
