//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument
//! 2. Environment variable (handled together with 1 by the binary's argument parser)
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";

/// Bootstrap configuration loaded from TOML file
///
/// Application must restart to pick up changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP listen address, e.g. "0.0.0.0:8080"
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or full `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge command-line/environment values over the TOML file over built-in defaults
    pub fn resolve(
        cli_database: Option<PathBuf>,
        cli_bind: Option<String>,
        toml_config: Option<&TomlConfig>,
    ) -> Self {
        let database_path = cli_database
            .or_else(|| toml_config.and_then(|c| c.database_path.clone()))
            .unwrap_or_else(default_database_path);

        let bind_address = cli_bind
            .or_else(|| toml_config.and_then(|c| c.bind_address.clone()))
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let log_level = toml_config
            .map(|c| c.logging.level.clone())
            .unwrap_or_else(default_log_level);

        Self {
            database_path,
            bind_address,
            log_level,
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Locate the platform config file, if one exists
///
/// Linux checks `~/.config/mdb/config.toml` then `/etc/mdb/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mdb").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mdb/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mdb"))
        .unwrap_or_else(|| PathBuf::from("./mdb_data"))
        .join("mdb.db")
}
