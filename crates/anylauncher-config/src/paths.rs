//! Catalog location resolution
//!
//! The catalog lives in exactly one directory per run, decided once at
//! startup. Preference order: configured directory, the executable's own
//! directory when writable (where older releases kept `games.json`), then the
//! per-user configuration directory.

use crate::{CatalogConfig, ConfigError};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "anylauncher";
pub const CATALOG_FILE_NAME: &str = "games.json";
pub const LOCK_FILE_NAME: &str = "games.lock";

/// Why a catalog directory was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    /// `catalog.dir` in the configuration
    Configured,
    /// Directory of the running executable
    ExecutableDir,
    /// Per-user configuration directory
    UserConfigDir,
}

impl LocationSource {
    pub fn describe(&self) -> &'static str {
        match self {
            LocationSource::Configured => "configured directory",
            LocationSource::ExecutableDir => "executable directory",
            LocationSource::UserConfigDir => "user configuration directory",
        }
    }
}

/// Resolved catalog directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLocation {
    pub dir: PathBuf,
    pub source: LocationSource,
}

impl CatalogLocation {
    /// Use a fixed directory
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            source: LocationSource::Configured,
        }
    }

    /// Resolve the catalog directory for this process
    pub fn resolve(config: &CatalogConfig) -> Result<Self, ConfigError> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self::resolve_from(config, exe_dir.as_deref(), user_config_dir())
    }

    fn resolve_from(
        config: &CatalogConfig,
        exe_dir: Option<&Path>,
        user_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = &config.dir {
            std::fs::create_dir_all(dir)?;
            tracing::debug!("Using configured catalog directory {}", dir.display());
            return Ok(Self::at(dir));
        }

        if config.prefer_exe_dir {
            if let Some(dir) = exe_dir.filter(|dir| is_writable_dir(dir)) {
                tracing::debug!("Using executable directory {} for catalog", dir.display());
                return Ok(Self {
                    dir: dir.to_path_buf(),
                    source: LocationSource::ExecutableDir,
                });
            }
        }

        let dir = user_dir.ok_or(ConfigError::NoUserDirectory)?;
        std::fs::create_dir_all(&dir)?;
        tracing::debug!("Using user configuration directory {} for catalog", dir.display());

        Ok(Self {
            dir,
            source: LocationSource::UserConfigDir,
        })
    }

    /// Path of `games.json`
    pub fn catalog_file(&self) -> PathBuf {
        self.dir.join(CATALOG_FILE_NAME)
    }

    /// Path of the companion lock file
    pub fn lock_file(&self) -> PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }
}

/// Per-user configuration directory for AnyLauncher
pub fn user_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Check whether the current user may create files in `dir`
#[cfg(unix)]
pub fn is_writable_dir(dir: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};

    dir.is_dir() && access(dir, AccessFlags::W_OK).is_ok()
}

/// Check whether the current user may create files in `dir`
#[cfg(not(unix))]
pub fn is_writable_dir(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|meta| meta.is_dir() && !meta.permissions().readonly())
        .unwrap_or(false)
}
