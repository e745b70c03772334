//! Runner configuration.
//!
//! Loaded via the `config` crate from `MEDIAFLOW_*` environment variables,
//! e.g. `MEDIAFLOW_FETCH_TIMEOUT_MS=5000` or `MEDIAFLOW_OUTPUT_DIR=/tmp/out`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "MEDIAFLOW";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// Timeout for downloading input media, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Directory derived media is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("mediaflow-output")
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: default_fetch_timeout_ms(),
            output_dir: default_output_dir(),
            log_filter: default_log_filter(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(environment())
    }

    fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
