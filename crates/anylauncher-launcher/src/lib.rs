//! Game launching for AnyLauncher
//!
//! Starts registered games after checking their files: web pages go to the
//! desktop's default handler, everything else is spawned as a tracked child
//! process that can be terminated when the launcher shuts down.

mod kind;
mod launcher;
mod registry;

pub use kind::GameKind;
pub use launcher::{DocumentOpener, ProcessLauncher, SystemOpener};
pub use registry::{ProcessRegistry, ShutdownReport, TrackedProcess};

use anylauncher_catalog::ContentHash;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// How a successful launch was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Started {
    /// Child process tracked in the registry
    Spawned { pid: u32 },
    /// Handed to the system handler, not tracked
    Opened,
}

/// Why the OS refused to start a game
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchFailure {
    #[error("permission denied")]
    PermissionDenied,

    #[error("executable not found")]
    ExecutableNotFound,

    #[error("{0}")]
    Os(String),
}

impl LaunchFailure {
    pub(crate) fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => LaunchFailure::PermissionDenied,
            io::ErrorKind::NotFound => LaunchFailure::ExecutableNotFound,
            _ => LaunchFailure::Os(err.to_string()),
        }
    }
}

/// Result of a launch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started(Started),
    FileMissing(PathBuf),
    IntegrityMismatch {
        path: PathBuf,
        expected: ContentHash,
        actual: Option<ContentHash>,
    },
    LaunchFailed {
        path: PathBuf,
        reason: LaunchFailure,
    },
}

impl LaunchOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, LaunchOutcome::Started(_))
    }
}

impl fmt::Display for LaunchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchOutcome::Started(Started::Spawned { pid }) => {
                write!(f, "Game started (pid {})", pid)
            }
            LaunchOutcome::Started(Started::Opened) => {
                write!(f, "Game opened with the default handler")
            }
            LaunchOutcome::FileMissing(path) => {
                write!(f, "Game file does not exist: {}", path.display())
            }
            LaunchOutcome::IntegrityMismatch { path, .. } => write!(
                f,
                "Game file {} was modified or damaged since import; import it again",
                path.display()
            ),
            LaunchOutcome::LaunchFailed {
                path,
                reason: LaunchFailure::PermissionDenied,
            } => write!(
                f,
                "Permission denied starting {}; check it is executable and you have rights to run it",
                path.display()
            ),
            LaunchOutcome::LaunchFailed {
                path,
                reason: LaunchFailure::ExecutableNotFound,
            } => write!(
                f,
                "Cannot find {}; the file may have been removed or its path contains unsupported characters",
                path.display()
            ),
            LaunchOutcome::LaunchFailed { path, reason } => {
                write!(f, "Failed to start {}: {}", path.display(), reason)
            }
        }
    }
}
