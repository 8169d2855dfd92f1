//! Configuration management

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use phoneos_protocol::DEFAULT_SERVER_ADDR;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::state::DEFAULT_NOTIFICATION_CAPACITY;

/// What to do with a well-formed message whose `type` is not recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTypePolicy {
    /// Drop the message without replying
    #[default]
    Ignore,
    /// Reply with an `error` message naming the type
    Reply,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (host:port)
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Status push interval in milliseconds
    #[serde(default = "default_status_interval")]
    pub status_interval_ms: u64,
    /// Lower bound of the random notification delay in milliseconds
    #[serde(default = "default_notification_min_delay")]
    pub notification_min_delay_ms: u64,
    /// Upper bound of the random notification delay in milliseconds
    #[serde(default = "default_notification_max_delay")]
    pub notification_max_delay_ms: u64,
    /// Notifications kept in memory; older ones are dropped
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
    #[serde(default)]
    pub unknown_type_policy: UnknownTypePolicy,
}

fn default_listen() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}
fn default_status_interval() -> u64 {
    5000
}
fn default_notification_min_delay() -> u64 {
    30_000
}
fn default_notification_max_delay() -> u64 {
    120_000
}
fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            status_interval_ms: default_status_interval(),
            notification_min_delay_ms: default_notification_min_delay(),
            notification_max_delay_ms: default_notification_max_delay(),
            notification_capacity: default_notification_capacity(),
            unknown_type_policy: UnknownTypePolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user config file is
    /// read if present, otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::config_path()?;
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    Ok(ServerConfig::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Get the per-user configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "phoneos", "PhoneOS")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.status_interval_ms == 0 {
            bail!("status_interval_ms must be greater than 0");
        }
        if self.notification_max_delay_ms == 0 {
            bail!("notification_max_delay_ms must be greater than 0");
        }
        if self.notification_min_delay_ms > self.notification_max_delay_ms {
            bail!(
                "notification_min_delay_ms ({}) exceeds notification_max_delay_ms ({})",
                self.notification_min_delay_ms,
                self.notification_max_delay_ms
            );
        }
        if self.notification_capacity == 0 {
            bail!("notification_capacity must be greater than 0");
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn notification_delay(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.notification_min_delay_ms),
            Duration::from_millis(self.notification_max_delay_ms),
        )
    }
}
