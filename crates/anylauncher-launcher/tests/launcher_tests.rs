//! Integration tests for launching catalog games

use anylauncher_catalog::{CatalogService, CatalogStore, ContentHash, IntegrityChecker};
use anylauncher_launcher::{
    DocumentOpener, LaunchFailure, LaunchOutcome, ProcessLauncher, Started,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct RecordingOpener {
    opened: Arc<Mutex<Vec<PathBuf>>>,
}

impl DocumentOpener for RecordingOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Test environment for launcher integration tests
struct LauncherTestEnv {
    temp_dir: TempDir,
    games_dir: PathBuf,
    opener: RecordingOpener,
}

impl LauncherTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let games_dir = temp_dir.path().join("games");
        fs::create_dir_all(&games_dir).unwrap();

        Self {
            temp_dir,
            games_dir,
            opener: RecordingOpener::default(),
        }
    }

    fn launcher(&self) -> ProcessLauncher {
        ProcessLauncher::new().with_opener(self.opener.clone())
    }

    fn service(&self) -> CatalogService {
        CatalogService::new(CatalogStore::new(
            self.temp_dir.path().join("games.json"),
            self.temp_dir.path().join("games.lock"),
            Duration::from_secs(1),
        ))
    }

    fn create_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.games_dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[cfg(unix)]
    fn create_script(&self, dir: &str, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = self.games_dir.join(dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Launch, retrying spawn errors caused by another test thread forking
/// while the script was still open for writing
#[cfg(unix)]
fn launch_script(
    launcher: &mut ProcessLauncher,
    path: &Path,
    expected: Option<&ContentHash>,
) -> LaunchOutcome {
    let mut outcome = launcher.launch(path, expected);
    for _ in 0..5 {
        match &outcome {
            LaunchOutcome::LaunchFailed {
                reason: LaunchFailure::Os(_),
                ..
            } => {
                thread::sleep(Duration::from_millis(50));
                outcome = launcher.launch(path, expected);
            }
            _ => break,
        }
    }
    outcome
}

#[cfg(unix)]
fn wait_until_exited(launcher: &mut ProcessLauncher) {
    let start = Instant::now();
    while launcher.registry_mut().running() > 0 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_missing_file() {
    let env = LauncherTestEnv::new();
    let mut launcher = env.launcher();

    let path = env.games_dir.join("absent.exe");
    assert_eq!(launcher.launch(&path, None), LaunchOutcome::FileMissing(path));
    assert!(launcher.registry().is_empty());
}

#[test]
fn test_integrity_mismatch_blocks_web_page() {
    let env = LauncherTestEnv::new();
    let page = env.create_file("game.html", b"<html>v1</html>");
    let stored = IntegrityChecker::hash(&page).unwrap();
    fs::write(&page, b"<html>v2</html>").unwrap();

    let mut launcher = env.launcher();
    let outcome = launcher.launch(&page, Some(&stored));

    assert!(matches!(
        outcome,
        LaunchOutcome::IntegrityMismatch { ref expected, actual: Some(_), .. } if *expected == stored
    ));
    assert!(env.opener.opened.lock().unwrap().is_empty());
}

#[test]
fn test_catalog_record_launch() {
    let env = LauncherTestEnv::new();
    let page = env.create_file("Puzzle.HTML", b"<html>puzzle</html>");
    let service = env.service();
    let saved = service.import_file(&page, None).unwrap();
    service.select_game(saved.record.id()).unwrap();

    let selected = service.get_selected().unwrap().unwrap();
    let mut launcher = env.launcher();

    assert_eq!(
        launcher.launch_record(&selected),
        LaunchOutcome::Started(Started::Opened)
    );
    assert_eq!(*env.opener.opened.lock().unwrap(), vec![page]);
}

#[test]
fn test_blank_stored_digest_skips_verification() {
    let env = LauncherTestEnv::new();
    let page = env.create_file("legacy.html", b"<html>legacy</html>");
    fs::write(
        env.temp_dir.path().join("games.json"),
        format!(
            r#"[{{"id": "legacy", "name": "Legacy", "path": {:?}, "md5": "", "is_last_selected": true}}]"#,
            page.to_string_lossy()
        ),
    )
    .unwrap();

    let selected = env.service().get_selected().unwrap().unwrap();
    assert!(selected.content_hash.is_none());

    let mut launcher = env.launcher();
    assert_eq!(
        launcher.launch_record(&selected),
        LaunchOutcome::Started(Started::Opened)
    );
}

#[cfg(unix)]
#[test]
fn test_integrity_mismatch_does_not_spawn() {
    let env = LauncherTestEnv::new();
    let script = env.create_script("tampered", "run.sh", "touch spawned");
    let stored = ContentHash::new("00000000000000000000000000000000");

    let mut launcher = env.launcher();
    let outcome = launcher.launch(&script, Some(&stored));

    assert!(matches!(outcome, LaunchOutcome::IntegrityMismatch { .. }));
    assert!(launcher.registry().is_empty());
    thread::sleep(Duration::from_millis(100));
    assert!(!env.games_dir.join("tampered").join("spawned").exists());
}

#[cfg(unix)]
#[test]
fn test_spawn_runs_in_game_directory() {
    let env = LauncherTestEnv::new();
    let script = env.create_script("shooter", "run.sh", "pwd > launched_from.txt");
    let hash = IntegrityChecker::hash(&script);

    let mut launcher = env.launcher();
    let outcome = launch_script(&mut launcher, &script, hash.as_ref());

    assert!(matches!(
        outcome,
        LaunchOutcome::Started(Started::Spawned { .. })
    ));
    assert_eq!(launcher.registry().len(), 1);

    wait_until_exited(&mut launcher);
    let cwd = fs::read_to_string(env.games_dir.join("shooter").join("launched_from.txt")).unwrap();
    assert_eq!(
        fs::canonicalize(cwd.trim()).unwrap(),
        fs::canonicalize(env.games_dir.join("shooter")).unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_non_executable_file_fails() {
    let env = LauncherTestEnv::new();
    let data = env.create_file("game.bin", b"not a program");

    let mut launcher = env.launcher();
    let outcome = launcher.launch(&data, None);

    assert!(matches!(
        outcome,
        LaunchOutcome::LaunchFailed {
            reason: LaunchFailure::PermissionDenied,
            ..
        }
    ));
    assert!(launcher.registry().is_empty());
}

#[cfg(unix)]
#[test]
fn test_shutdown_terminates_tracked_games() {
    let env = LauncherTestEnv::new();
    let script = env.create_script("idle", "run.sh", "exec sleep 30");

    let mut launcher = env.launcher();
    assert!(launch_script(&mut launcher, &script, None).is_started());
    assert_eq!(launcher.registry_mut().running(), 1);

    let report = launcher.shutdown();

    assert_eq!(report.terminated + report.killed, 1);
    assert_eq!(report.failed, 0);
    assert!(launcher.registry().is_empty());
}
