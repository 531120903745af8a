//! Configuration management for AnyLauncher
//!
//! Handles launcher settings and decides where the game catalog lives.
//! Settings are TOML files, optionally layered with environment overrides.

mod paths;

pub use paths::{
    APP_NAME, CATALOG_FILE_NAME, CatalogLocation, LOCK_FILE_NAME, LocationSource,
    is_writable_dir, user_config_dir,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("No per-user configuration directory is available on this system")]
    NoUserDirectory,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to assemble configuration: {0}")]
    Layered(#[from] ::config::ConfigError),
}

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "ANYLAUNCHER_CONFIG";

/// Prefix for environment overrides, e.g. `ANYLAUNCHER__CATALOG__LOCK_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "ANYLAUNCHER";

/// Main launcher configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LauncherConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub launch: LaunchSettings,
}

/// Where and how the catalog file is accessed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Explicit catalog directory, overrides location resolution
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Keep the catalog beside the executable when that directory is writable
    #[serde(default = "default_prefer_exe_dir")]
    pub prefer_exe_dir: bool,

    /// Maximum wait for the catalog lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_prefer_exe_dir() -> bool {
    true
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefer_exe_dir: default_prefer_exe_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl CatalogConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Game launch behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSettings {
    /// Compare the stored digest before starting a game
    #[serde(default = "default_verify_integrity")]
    pub verify_integrity: bool,

    /// How long a game gets to exit after being asked to terminate
    #[serde(default = "default_terminate_grace_ms")]
    pub terminate_grace_ms: u64,
}

fn default_verify_integrity() -> bool {
    true
}

fn default_terminate_grace_ms() -> u64 {
    3000
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            verify_integrity: default_verify_integrity(),
            terminate_grace_ms: default_terminate_grace_ms(),
        }
    }
}

impl LaunchSettings {
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

impl LauncherConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from an optional file plus environment overrides.
    ///
    /// The file is `explicit` when given, otherwise `$ANYLAUNCHER_CONFIG`;
    /// either must exist. Without both, `config.toml` in the user config
    /// directory is read if present, else built-in defaults apply.
    pub fn load_layered(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        match named {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                builder = builder.add_source(::config::File::from(path.as_path()).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    tracing::debug!("Looking for configuration at {}", path.display());
                    builder =
                        builder.add_source(::config::File::from(path.as_path()).required(false));
                }
            }
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Configuration file used when none is given explicitly
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    user_config_dir().map(|dir| dir.join("config.toml"))
}
