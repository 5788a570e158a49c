//! Configuration loading for rendezvous-relay.
//!
//! Configuration is loaded from a TOML file; every field has a default, so an
//! empty file (or no file at all) yields a working server.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Root configuration for rendezvous-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session lifecycle configuration.
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Expiry/reap sweep configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (default: 0.0.0.0:8080).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Time-to-live of a new session in milliseconds (default: 60000).
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Chunks buffered in a relay pipe before the source is back-pressured
    /// (default: 16).
    #[serde(default = "default_pipe_capacity")]
    pub pipe_capacity: usize,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Maximum `POST /stream` body size in bytes (default: 1 MiB).
    #[serde(default = "default_max_create_body")]
    pub max_create_body: usize,
    /// Enable the metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Expiry/reap sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Sweep interval in milliseconds (default: 1000).
    #[serde(default = "default_sweep_interval_ms")]
    pub interval_ms: u64,
    /// Seconds a terminal session stays listed before it is reaped
    /// (default: 30).
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    /// Enable the sweep task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_ttl_ms() -> u64 {
    60_000 // 1 minute
}

fn default_pipe_capacity() -> usize {
    16
}

fn default_max_create_body() -> usize {
    1024 * 1024 // 1MiB
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_sweep_interval_ms() -> u64 {
    1000
}

fn default_retention_secs() -> u64 {
    30
}

fn default_cleanup_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            pipe_capacity: default_pipe_capacity(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_create_body: default_max_create_body(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sweep_interval_ms(),
            retention_secs: default_retention_secs(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl SessionsConfig {
    /// Session TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl CleanupConfig {
    /// Sweep interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Retention window as a duration.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// fails [`Config::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sessions.ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sessions.ttl_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.sessions.pipe_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "sessions.pipe_capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cleanup.enabled && self.cleanup.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "cleanup.interval_ms",
                reason: "must be greater than zero when cleanup is enabled".to_string(),
            });
        }
        Ok(())
    }
}
