//! Configuration Module
//!
//! Loads server configuration from an optional JSON file, then applies
//! environment variable overrides.

use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Config file read at startup when `CACHEMAN_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/cacheserver/config.json";

/// Server configuration parameters.
///
/// Every field has a default, so a config file may set any subset of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server bind address
    pub bind_addr: String,
    /// TTL in seconds for inserts that don't specify one
    pub expires_default_duration_sec: i64,
    /// Replication generation rotation cadence in milliseconds
    pub replication_rotate_every_ms: u64,
    /// Scheduler tick cadence and rounding granularity in seconds
    #[serde(alias = "sheduler_del_expired_every_sec")]
    pub scheduler_del_expired_every_sec: i64,
    /// Capacity of the scheduler's expired-key queue
    #[serde(alias = "sheduler_expired_queque_size")]
    pub scheduler_expired_queue_size: usize,
    /// Capacity of the replication ingestion queue
    #[serde(alias = "replication_active_queque_size")]
    pub replication_active_queue_size: usize,
    /// Delay between retries while the replication queue is full
    pub replication_backoff_ms: u64,
}

impl Config {
    // == Load ==
    /// Loads configuration the way the server does at startup.
    ///
    /// Reads the JSON file named by `CACHEMAN_CONFIG` (or
    /// [`DEFAULT_CONFIG_PATH`]) if it exists, then applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CACHEMAN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);

        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    /// Parses a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds a config from defaults and environment variables only.
    ///
    /// # Environment Variables
    /// - `BIND_ADDR` - HTTP bind address (default: 0.0.0.0:8080)
    /// - `EXPIRES_DEFAULT_DURATION_SEC` - Default TTL (default: 1800)
    /// - `REPLICATION_ROTATE_EVERY_MS` - Rotation cadence (default: 1000)
    /// - `SCHEDULER_DEL_EXPIRED_EVERY_SEC` - Scheduler tick (default: 60)
    /// - `SCHEDULER_EXPIRED_QUEUE_SIZE` - Expired-key queue size (default: 1000)
    /// - `REPLICATION_ACTIVE_QUEUE_SIZE` - Replication queue size (default: 1000)
    /// - `REPLICATION_BACKOFF_MS` - Full-queue retry delay (default: 100)
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Applies overrides found by `lookup`, keyed by environment variable name.
    ///
    /// Values that fail to parse are ignored.
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        override_from(&lookup, "EXPIRES_DEFAULT_DURATION_SEC", &mut self.expires_default_duration_sec);
        override_from(&lookup, "REPLICATION_ROTATE_EVERY_MS", &mut self.replication_rotate_every_ms);
        override_from(
            &lookup,
            "SCHEDULER_DEL_EXPIRED_EVERY_SEC",
            &mut self.scheduler_del_expired_every_sec,
        );
        override_from(
            &lookup,
            "SCHEDULER_EXPIRED_QUEUE_SIZE",
            &mut self.scheduler_expired_queue_size,
        );
        override_from(
            &lookup,
            "REPLICATION_ACTIVE_QUEUE_SIZE",
            &mut self.replication_active_queue_size,
        );
        override_from(&lookup, "REPLICATION_BACKOFF_MS", &mut self.replication_backoff_ms);
        self
    }

    // == Validate ==
    /// Rejects values the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Invalid(format!("bind_addr {:?}: {}", self.bind_addr, e))
        })?;

        if self.expires_default_duration_sec < 1 {
            return Err(ConfigError::Invalid(
                "expires_default_duration_sec must be at least 1".to_string(),
            ));
        }
        if self.replication_rotate_every_ms == 0 {
            return Err(ConfigError::Invalid(
                "replication_rotate_every_ms must be positive".to_string(),
            ));
        }
        if self.scheduler_del_expired_every_sec < 1 {
            return Err(ConfigError::Invalid(
                "scheduler_del_expired_every_sec must be at least 1".to_string(),
            ));
        }
        if self.scheduler_expired_queue_size == 0 || self.replication_active_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "queue sizes must be positive".to_string(),
            ));
        }
        if self.replication_backoff_ms == 0 {
            return Err(ConfigError::Invalid(
                "replication_backoff_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Replication rotation cadence.
    pub fn rotate_interval(&self) -> Duration {
        Duration::from_millis(self.replication_rotate_every_ms)
    }

    /// Retry delay for a full replication queue.
    pub fn replication_backoff(&self) -> Duration {
        Duration::from_millis(self.replication_backoff_ms)
    }
}

fn override_from<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    target: &mut T,
) {
    if let Some(value) = lookup(name).and_then(|v| v.parse().ok()) {
        *target = value;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            expires_default_duration_sec: 30 * 60,
            replication_rotate_every_ms: 1000,
            scheduler_del_expired_every_sec: 60,
            scheduler_expired_queue_size: 1000,
            replication_active_queue_size: 1000,
            replication_backoff_ms: 100,
        }
    }
}
