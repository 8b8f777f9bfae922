//! Configuration for the blockflow runtime
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (explicit path, else `blockflow.toml` if present)
//! 3. Environment variables prefixed `BLOCKFLOW`, sections separated by `__`
//!    (e.g. `BLOCKFLOW_SEQUENCER__WARP_TIME_MS=250`). A `.env` file is read
//!    first.

use crate::engine::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "blockflow.toml";
const ENV_PREFIX: &str = "BLOCKFLOW";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sequencer: SequencerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Longest a warp-mode thread runs before it must yield
    pub warp_time_ms: u64,
    /// Budget for all stepping passes within one tick
    pub work_time_ms: u64,
    /// Tick interval used by the CLI loop
    pub tick_interval_ms: u64,
    /// Tick limit used by the CLI loop
    pub max_ticks: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            warp_time_ms: 500,
            work_time_ms: 12,
            tick_interval_ms: 16,
            max_ticks: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default file and environment
    pub fn load() -> Result<Self, EngineError> {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    read_env: Option<bool>,
}

impl ConfigBuilder {
    /// Config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Whether environment variables are consulted (default true)
    pub fn read_env(mut self, read_env: bool) -> Self {
        self.read_env = Some(read_env);
        self
    }

    pub fn build(self) -> Result<Config, EngineError> {
        let mut builder = config::Config::builder();

        builder = match &self.config_path {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        if self.read_env.unwrap_or(true) {
            dotenvy::dotenv().ok();
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config = builder.build()?.try_deserialize::<Config>()?;
        Ok(config)
    }
}
