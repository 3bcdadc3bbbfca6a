//! Application configuration.
//!
//! Loaded from a TOML file the way the reference stack's `AppConfig`
//! is loaded: an env var overrides the path, otherwise a platform
//! config directory (`dirs-next`) is used, and any load failure falls
//! back to compiled-in defaults rather than aborting startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::support::InfraError;

/// Name of the env var that overrides the config file path.
pub const CONFIG_PATH_ENV: &str = "WATT_STATION_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            shutdown_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StationSection {
    pub waiting_capacity: usize,
    pub local_queue_capacity: usize,
    pub fast_power_kw: f64,
    pub trickle_power_kw: f64,
    pub scheduler_tick_secs: u64,
    pub fast_pile_count: u32,
    pub trickle_pile_count: u32,
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            waiting_capacity: 10,
            local_queue_capacity: 2,
            fast_power_kw: 30.0,
            trickle_power_kw: 10.0,
            scheduler_tick_secs: 5,
            fast_pile_count: 2,
            trickle_pile_count: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory the JSON-file store writes its entity files and
    /// backups under. Relative to the current working directory.
    pub data_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub station: StationSection,
    pub logging: LoggingSection,
    pub storage: StorageSection,
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults for any
    /// section (or the whole file) that is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| InfraError::Config(format!("reading {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| InfraError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// The default config file path: `$WATT_STATION_CONFIG`, or
/// `<config dir>/watt-station/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("watt-station")
        .join("config.toml")
}
