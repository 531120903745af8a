//! Path normalization for stored game paths

use std::io;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute and fold `.` and `..` components lexically.
///
/// Symlinks are not resolved, so the result is stable even when the target
/// does not exist yet.
pub fn normalize_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_becomes_absolute() {
        let normalized = normalize_path(Path::new("games/foo.exe")).unwrap();
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("games/foo.exe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_dot_components_are_folded() {
        let normalized = normalize_path(Path::new("/games/./old/../new/foo.exe")).unwrap();
        assert_eq!(normalized, PathBuf::from("/games/new/foo.exe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_parent_of_root_stays_root() {
        let normalized = normalize_path(Path::new("/../foo.exe")).unwrap();
        assert_eq!(normalized, PathBuf::from("/foo.exe"));
    }

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(normalize_path(Path::new("")).is_err());
    }
}
