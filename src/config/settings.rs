//! Application configuration loading from config.toml
//!
//! The file names the remote server and tunes how the extraction talks to it.
//! Secrets are not read from here; see [`super::credentials`].

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{path::Path, time::Duration};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// `[server]` section
    pub server: ServerConfig,
    /// `[extraction]` section; every field has a default
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Store connection string; `DATABASE_URL` takes precedence when set
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Remote server connection settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// API root, e.g. `https://bes.example.com:52311/api/`
    pub base_url: String,
    /// Basic-auth user; the password comes from `BES_PASSWORD`
    pub username: String,
    /// Accept invalid TLS certificates (self-signed root servers)
    #[serde(default)]
    pub ignore_ssl: bool,
    /// Per-request timeout in seconds; must be at least 1
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts; attempt `n` waits `n` times this
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ServerConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base retry delay as a [`Duration`].
    #[must_use]
    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Extraction tuning
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    /// Maximum number of leaf requests in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Keep inserting the rest of a batch after a record fails to store
    #[serde(default)]
    pub isolate_failures: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            isolate_failures: false,
        }
    }
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

const fn default_concurrency() -> usize {
    8
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
/// - `concurrency`, `timeout_secs` or `max_attempts` is zero
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Loads the configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.extraction.concurrency == 0 {
        return Err(Error::Config {
            message: "extraction.concurrency must be at least 1".to_string(),
        });
    }
    if config.server.timeout_secs == 0 {
        return Err(Error::Config {
            message: "server.timeout_secs must be at least 1".to_string(),
        });
    }
    if config.server.max_attempts == 0 {
        return Err(Error::Config {
            message: "server.max_attempts must be at least 1".to_string(),
        });
    }

    Ok(config)
}
