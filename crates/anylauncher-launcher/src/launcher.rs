//! Main game launcher

use crate::kind::GameKind;
use crate::registry::{ProcessRegistry, ShutdownReport};
use crate::{LaunchFailure, LaunchOutcome, Started};
use anylauncher_catalog::{ContentHash, GameRecord, IntegrityChecker, Verification, normalize_path};
use anylauncher_config::LaunchSettings;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Opens documents with whatever the desktop associates with them
pub trait DocumentOpener: Send {
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Desktop default handler via the `open` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DocumentOpener for SystemOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        open::that_detached(path)
    }
}

/// Starts games and owns the processes it spawned
pub struct ProcessLauncher {
    registry: ProcessRegistry,
    opener: Box<dyn DocumentOpener>,
    verify_integrity: bool,
    terminate_grace: Duration,
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::with_settings(&LaunchSettings::default())
    }
}

impl ProcessLauncher {
    /// Create a launcher with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a launcher from configuration
    pub fn with_settings(settings: &LaunchSettings) -> Self {
        Self {
            registry: ProcessRegistry::new(),
            opener: Box::new(SystemOpener),
            verify_integrity: settings.verify_integrity,
            terminate_grace: settings.terminate_grace(),
        }
    }

    /// Replace the handler used for web pages
    pub fn with_opener(mut self, opener: impl DocumentOpener + 'static) -> Self {
        self.opener = Box::new(opener);
        self
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProcessRegistry {
        &mut self.registry
    }

    /// Launch a game file, checking it against `expected` first
    pub fn launch(&mut self, path: &Path, expected: Option<&ContentHash>) -> LaunchOutcome {
        if path.as_os_str().is_empty() {
            return LaunchOutcome::FileMissing(path.to_path_buf());
        }

        let path = match normalize_path(path) {
            Ok(path) => path,
            Err(_) => return LaunchOutcome::FileMissing(path.to_path_buf()),
        };

        if !path.is_file() {
            tracing::warn!("Game file missing: {}", path.display());
            return LaunchOutcome::FileMissing(path);
        }

        if let Some(expected) = expected.filter(|_| self.verify_integrity) {
            let actual = match IntegrityChecker::verify(&path, expected) {
                Verification::Match => None,
                Verification::Mismatch { actual } => Some(Some(actual)),
                Verification::Unreadable => Some(None),
            };
            if let Some(actual) = actual {
                tracing::warn!(
                    "Integrity check failed for {}: expected {}, got {}",
                    path.display(),
                    expected,
                    actual.as_ref().map(ContentHash::as_str).unwrap_or("unreadable")
                );
                return LaunchOutcome::IntegrityMismatch {
                    path,
                    expected: expected.clone(),
                    actual,
                };
            }
        }

        let kind = GameKind::of(&path);
        tracing::debug!("Starting {} as {}", path.display(), kind.display_name());

        match kind {
            GameKind::WebPage => self.open_page(&path),
            GameKind::Executable => self.spawn(&path),
        }
    }

    /// Launch a catalog record
    pub fn launch_record(&mut self, record: &GameRecord) -> LaunchOutcome {
        tracing::info!("Launching '{}' ({})", record.name, record.id());
        self.launch(record.path(), record.content_hash.as_ref())
    }

    /// Stop every tracked game using the configured grace period
    pub fn shutdown(&mut self) -> ShutdownReport {
        self.registry.terminate_all(self.terminate_grace)
    }

    fn open_page(&self, path: &Path) -> LaunchOutcome {
        tracing::info!("Opening {} with the default handler", path.display());

        match self.opener.open(path) {
            Ok(()) => LaunchOutcome::Started(Started::Opened),
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", path.display(), e);
                LaunchOutcome::LaunchFailed {
                    path: path.to_path_buf(),
                    reason: LaunchFailure::from_io(&e),
                }
            }
        }
    }

    fn spawn(&mut self, path: &Path) -> LaunchOutcome {
        let mut cmd = Command::new(path);

        // games look for assets next to themselves
        if let Some(dir) = path.parent() {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        own_process_group(&mut cmd);

        tracing::info!("Spawning {}", path.display());

        match cmd.spawn() {
            Ok(child) => {
                let pid = self.registry.track(path, child);
                tracing::debug!("Tracking game process {}", pid);
                LaunchOutcome::Started(Started::Spawned { pid })
            }
            Err(e) => {
                tracing::warn!("Failed to spawn {}: {}", path.display(), e);
                LaunchOutcome::LaunchFailed {
                    path: path.to_path_buf(),
                    reason: LaunchFailure::from_io(&e),
                }
            }
        }
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn own_process_group(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn own_process_group(_cmd: &mut Command) {}
