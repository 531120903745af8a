//! Advisory lock around catalog read/modify/write cycles

use crate::CatalogError;
use fs4::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Delay between attempts while the lock is held elsewhere
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive lock on the companion `games.lock` file.
///
/// Every acquisition opens its own handle, so two holders inside one process
/// exclude each other just like two processes do.
#[derive(Debug, Clone)]
pub struct CatalogLock {
    path: PathBuf,
    timeout: Duration,
}

/// Held lock; released on drop
#[derive(Debug)]
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl CatalogLock {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, waiting at most the configured timeout
    pub fn acquire(&self) -> Result<LockGuard, CatalogError> {
        let file = self.open()?;
        let start = Instant::now();

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(
                        "Acquired catalog lock {} after {:?}",
                        self.path.display(),
                        start.elapsed()
                    );
                    return Ok(LockGuard {
                        file,
                        path: self.path.clone(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = start.elapsed();
                    if waited >= self.timeout {
                        tracing::warn!(
                            "Gave up on catalog lock {} after {:?}",
                            self.path.display(),
                            waited
                        );
                        return Err(CatalogError::LockTimeout {
                            path: self.path.clone(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(LOCK_POLL_INTERVAL.min(self.timeout - waited));
                }
                Err(e) => return Err(CatalogError::io(&self.path, e)),
            }
        }
    }

    fn open(&self) -> Result<File, CatalogError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|e| CatalogError::io(&self.path, e))
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release catalog lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if err.raw_os_error() == Some(33) {
        return true;
    }
    false
}
