//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. The `[smtp]` table holds the
//! raw key/value settings handed to the sender's configuration store; the
//! password may instead come from the `COURIER_SMTP_PASSWORD` environment
//! variable so it never has to live in the file.
//!
//! # Example
//!
//! ```no_run
//! use courier::config::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.logging.init();
//!     Ok(())
//! }
//! ```

mod logging;
mod pool;

pub use logging::LoggingConfig;
pub use pool::PoolConfig;

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::domain::keys;
use crate::error::{ConfigError, Result};

/// Environment variable overriding `smtp.password`.
pub const PASSWORD_ENV: &str = "COURIER_SMTP_PASSWORD";

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Queue and worker sizing.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Mail server settings, keyed as the configuration store expects
    /// (`hostname`, `hostport`, `username`, `password`, `ssl`, ...).
    ///
    /// Values may be written as TOML strings, integers or booleans.
    #[serde(default)]
    smtp: HashMap<String, toml::Value>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile(e.to_string()))?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.pool.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "queue_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.pool.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_count",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "format",
                reason: "must be \"pretty\" or \"json\"".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The `[smtp]` table flattened to strings, with the password taken
    /// from [`PASSWORD_ENV`] when set.
    #[must_use]
    pub fn smtp_settings(&self) -> HashMap<String, String> {
        let mut settings: HashMap<String, String> = self
            .smtp
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect();

        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            if !password.is_empty() {
                settings.insert(keys::PASSWORD.to_string(), password);
            }
        }
        settings
    }
}
