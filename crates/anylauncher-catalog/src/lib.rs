//! Game catalog for AnyLauncher
//!
//! Persists registered games as a JSON array guarded by an advisory file
//! lock, computes integrity digests, and exposes the catalog operations the
//! front ends call (import, edit, delete, select, list).

mod integrity;
mod lock;
mod path;
mod record;
mod service;
mod store;

pub use integrity::{CHUNK_SIZE, ContentHash, IntegrityChecker, Verification};
pub use lock::{CatalogLock, LOCK_POLL_INTERVAL, LockGuard};
pub use path::normalize_path;
pub use record::{GameId, GameRecord, MigrationReport, UNKNOWN_GAME_NAME};
pub use service::{CatalogService, Saved};
pub use store::CatalogStore;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog file {path} is corrupt: {source}")]
    CorruptCatalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Timed out after {timeout:?} waiting for catalog lock {path}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Game not found: {0}")]
    NotFound(GameId),

    #[error("Game name must not be empty")]
    EmptyName,

    #[error("Game path must not be empty")]
    EmptyPath,

    #[error("Game file not found: {0}")]
    FileMissing(PathBuf),

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    /// Classify an IO failure on `path`
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            CatalogError::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            CatalogError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Remediation to show next to the error, if the user can act on it
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CatalogError::CorruptCatalog { .. } => {
                Some("Repair the file by hand or delete it and import your games again.")
            }
            CatalogError::LockTimeout { .. } => {
                Some("Another launcher instance is using the catalog; try again in a moment.")
            }
            CatalogError::PermissionDenied { .. } => Some(
                "Make the catalog directory writable, run with sufficient rights, or set catalog.dir.",
            ),
            CatalogError::NotFound(_) => {
                Some("The game was removed elsewhere; refresh the list.")
            }
            CatalogError::FileMissing(_) => Some("Choose an existing game file."),
            _ => None,
        }
    }
}
