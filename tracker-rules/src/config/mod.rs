//! Configuration: `config.toml` tables parsed into a validated [`Config`].

pub mod loader;
pub mod model;

pub use loader::{load, load_or_default};
pub use model::{Config, ConfigError, EngineSettings, InputConfig, LoggingConfig, MetricsConfig, OutputConfig};
