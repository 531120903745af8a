//! Tracking of game processes started this session

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

/// Interval between exit checks while waiting for games to stop
const REAP_INTERVAL: Duration = Duration::from_millis(50);

/// A spawned game
#[derive(Debug)]
pub struct TrackedProcess {
    pid: u32,
    path: PathBuf,
    child: Child,
    started_at: Instant,
}

impl TrackedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// What happened to tracked games at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Had exited on their own
    pub already_exited: usize,
    /// Exited after the termination request
    pub terminated: usize,
    /// Outlived the grace period and were killed
    pub killed: usize,
    /// Could not be stopped or checked
    pub failed: usize,
}

/// Handles of every game spawned this session
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: Vec<TrackedProcess>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a spawned child, returning its pid
    pub fn track(&mut self, path: &Path, child: Child) -> u32 {
        let pid = child.id();
        self.processes.push(TrackedProcess {
            pid,
            path: path.to_path_buf(),
            child,
            started_at: Instant::now(),
        });
        pid
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn processes(&self) -> &[TrackedProcess] {
        &self.processes
    }

    /// Forget games that already exited, returning their exit statuses
    pub fn reap(&mut self) -> Vec<(u32, ExitStatus)> {
        let mut exited = Vec::new();
        self.processes.retain_mut(|p| match p.child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!(
                    "Game {} (pid {}) exited with {} after {:?}",
                    p.path.display(),
                    p.pid,
                    status,
                    p.uptime()
                );
                exited.push((p.pid, status));
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!("Cannot query game process {}: {}", p.pid, e);
                false
            }
        });
        exited
    }

    /// Number of tracked games still running
    pub fn running(&mut self) -> usize {
        self.reap();
        self.processes.len()
    }

    /// Ask every running game to stop, waiting up to `grace` before killing
    /// the ones that remain. Errors are logged, never returned.
    pub fn terminate_all(&mut self, grace: Duration) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let mut pending = Vec::new();

        for mut process in std::mem::take(&mut self.processes) {
            if let Ok(Some(_)) = process.child.try_wait() {
                report.already_exited += 1;
                continue;
            }
            if let Err(e) = request_terminate(&mut process.child) {
                tracing::warn!(
                    "Failed to ask game {} (pid {}) to exit: {}",
                    process.path.display(),
                    process.pid,
                    e
                );
            }
            pending.push(process);
        }

        let deadline = Instant::now() + grace;
        loop {
            pending.retain_mut(|p| match p.child.try_wait() {
                Ok(Some(_)) => {
                    report.terminated += 1;
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    tracing::warn!("Cannot query game process {}: {}", p.pid, e);
                    report.failed += 1;
                    false
                }
            });
            if pending.is_empty() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(REAP_INTERVAL);
        }

        for mut process in pending {
            match process.child.kill().and_then(|()| process.child.wait()) {
                Ok(_) => {
                    tracing::warn!(
                        "Game {} (pid {}) ignored the exit request and was killed",
                        process.path.display(),
                        process.pid
                    );
                    report.killed += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to kill game process {}: {}", process.pid, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Shutdown of tracked games: {} already exited, {} terminated, {} killed, {} failed",
            report.already_exited,
            report.terminated,
            report.killed,
            report.failed
        );
        report
    }
}

/// Send SIGTERM to the game's process group
#[cfg(unix)]
fn request_terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id()).map_err(io::Error::other)?;
    killpg(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) -> io::Result<()> {
    child.kill()
}
