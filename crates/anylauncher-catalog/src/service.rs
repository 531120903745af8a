//! Catalog operations used by the front ends
//!
//! Every mutating call is a single locked load-modify-save cycle on the
//! store, so it either rewrites the whole catalog or leaves it untouched.

use crate::integrity::{ContentHash, IntegrityChecker};
use crate::path::normalize_path;
use crate::record::{GameId, GameRecord};
use crate::store::CatalogStore;
use crate::CatalogError;
use std::path::{Path, PathBuf};

/// A record written by an import or edit
#[derive(Debug, Clone, PartialEq)]
pub struct Saved {
    pub record: GameRecord,

    /// Another record already uses this name. Allowed, but worth telling the user.
    pub name_collision: bool,
}

/// High-level catalog operations
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: CatalogStore,
}

impl CatalogService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Register a game under a fresh id
    pub fn import_game(
        &self,
        name: &str,
        path: &Path,
        hash: Option<ContentHash>,
    ) -> Result<Saved, CatalogError> {
        let name = validate_name(name)?;
        let path = absolute_game_path(path)?;

        let saved = self.store.update(|records| {
            let name_collision = records.iter().any(|r| r.name == name);
            let record = GameRecord::new(name, path, hash);
            records.push(record.clone());
            Ok(Saved {
                record,
                name_collision,
            })
        })?;

        if saved.name_collision {
            tracing::warn!("Imported game name '{}' is already in use", saved.record.name);
        }
        tracing::info!(
            "Imported '{}' ({}) from {}",
            saved.record.name,
            saved.record.id(),
            saved.record.path.display()
        );
        Ok(saved)
    }

    /// Register a game file, hashing it and naming it after the file when no
    /// name is given
    pub fn import_file(&self, path: &Path, name: Option<&str>) -> Result<Saved, CatalogError> {
        let path = existing_game_file(path)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => default_name(&path),
        };
        let hash = IntegrityChecker::hash(&path);

        self.import_game(&name, &path, hash)
    }

    /// Overwrite the mutable fields of a record
    pub fn update_game(
        &self,
        id: &GameId,
        name: &str,
        path: &Path,
        hash: Option<ContentHash>,
    ) -> Result<Saved, CatalogError> {
        let name = validate_name(name)?;
        let path = absolute_game_path(path)?;

        let saved = self.store.update(|records| {
            let name_collision = records.iter().any(|r| r.name == name && r.id() != id);
            let record = records
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

            record.name = name;
            record.path = path;
            record.content_hash = hash;

            Ok(Saved {
                record: record.clone(),
                name_collision,
            })
        })?;

        if saved.name_collision {
            tracing::warn!("Game name '{}' is already in use", saved.record.name);
        }
        tracing::info!("Updated '{}' ({})", saved.record.name, id);
        Ok(saved)
    }

    /// Change a record's name and/or file, recomputing its digest.
    ///
    /// Fields left as `None` keep their current value. The digest is always
    /// recomputed from the resulting path, inside the same locked cycle.
    pub fn edit_game(
        &self,
        id: &GameId,
        name: Option<&str>,
        path: Option<&Path>,
    ) -> Result<Saved, CatalogError> {
        let name = name.map(validate_name).transpose()?;
        let path = path.map(existing_game_file).transpose()?;

        let saved = self.store.update(|records| {
            let index = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| CatalogError::NotFound(id.clone()))?;

            let name = name.unwrap_or_else(|| records[index].name.clone());
            let path = match path {
                Some(path) => path,
                None => existing_game_file(&records[index].path)?,
            };
            let name_collision = records.iter().any(|r| r.name == name && r.id() != id);

            let record = &mut records[index];
            record.content_hash = IntegrityChecker::hash(&path);
            record.name = name;
            record.path = path;

            Ok(Saved {
                record: record.clone(),
                name_collision,
            })
        })?;

        if saved.name_collision {
            tracing::warn!("Game name '{}' is already in use", saved.record.name);
        }
        tracing::info!("Edited '{}' ({})", saved.record.name, id);
        Ok(saved)
    }

    /// Remove a record
    pub fn delete_game(&self, id: &GameId) -> Result<GameRecord, CatalogError> {
        let removed = self.store.update(|records| {
            let index = records
                .iter()
                .position(|r| r.id() == id)
                .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
            Ok(records.remove(index))
        })?;

        tracing::info!("Deleted '{}' ({})", removed.name, id);
        Ok(removed)
    }

    /// Make a record the single selected game
    pub fn select_game(&self, id: &GameId) -> Result<GameRecord, CatalogError> {
        let selected = self.store.update(|records| {
            if !records.iter().any(|r| r.id() == id) {
                return Err(CatalogError::NotFound(id.clone()));
            }

            let mut selected = None;
            for record in records.iter_mut() {
                record.is_selected = record.id() == id;
                if record.is_selected {
                    selected = Some(record.clone());
                }
            }
            selected.ok_or_else(|| CatalogError::NotFound(id.clone()))
        })?;

        tracing::info!("Selected '{}' ({})", selected.name, id);
        Ok(selected)
    }

    /// All records, the selected one first, otherwise in insertion order
    pub fn list_games(&self) -> Result<Vec<GameRecord>, CatalogError> {
        let mut records = self.store.load_healed()?;
        records.sort_by_key(|r| !r.is_selected);
        Ok(records)
    }

    /// The currently selected record, if any
    pub fn get_selected(&self) -> Result<Option<GameRecord>, CatalogError> {
        Ok(self.store.load_healed()?.into_iter().find(|r| r.is_selected))
    }

    /// Look up a record by id
    pub fn get_game(&self, id: &GameId) -> Result<Option<GameRecord>, CatalogError> {
        Ok(self.store.load_healed()?.into_iter().find(|r| r.id() == id))
    }
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName);
    }
    Ok(name.to_string())
}

fn absolute_game_path(path: &Path) -> Result<PathBuf, CatalogError> {
    if path.as_os_str().is_empty() {
        return Err(CatalogError::EmptyPath);
    }
    normalize_path(path).map_err(|e| CatalogError::io(path, e))
}

fn existing_game_file(path: &Path) -> Result<PathBuf, CatalogError> {
    let path = absolute_game_path(path)?;
    if !path.is_file() {
        return Err(CatalogError::FileMissing(path));
    }
    Ok(path)
}

fn default_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn service_in(dir: &TempDir) -> CatalogService {
        CatalogService::new(CatalogStore::new(
            dir.path().join("games.json"),
            dir.path().join("games.lock"),
            Duration::from_millis(500),
        ))
    }

    #[test]
    fn test_import_normalizes_and_trims() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        let saved = service
            .import_game("  Foo  ", &dir.path().join("sub/../foo.exe"), None)
            .unwrap();

        assert_eq!(saved.record.name, "Foo");
        assert_eq!(saved.record.path, dir.path().join("foo.exe"));
        assert!(!saved.name_collision);
    }

    #[test]
    fn test_import_rejects_blank_input() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        assert!(matches!(
            service.import_game("   ", Path::new("/games/foo.exe"), None),
            Err(CatalogError::EmptyName)
        ));
        assert!(matches!(
            service.import_game("Foo", Path::new(""), None),
            Err(CatalogError::EmptyPath)
        ));
        assert!(service.list_games().unwrap().is_empty());
    }

    #[test]
    fn test_import_file_defaults_name_and_hash() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let game = dir.path().join("Space Shooter.html");
        fs::write(&game, b"<html>pew</html>").unwrap();

        let saved = service.import_file(&game, None).unwrap();

        assert_eq!(saved.record.name, "Space Shooter");
        assert_eq!(
            saved.record.content_hash,
            Some(IntegrityChecker::hash_data(b"<html>pew</html>"))
        );
    }

    #[test]
    fn test_import_file_missing() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        let err = service
            .import_file(&dir.path().join("absent.exe"), Some("Absent"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::FileMissing(_)));
    }

    #[test]
    fn test_update_collision_ignores_self() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let foo = service.import_game("Foo", Path::new("/games/foo.exe"), None).unwrap();
        service.import_game("Bar", Path::new("/games/bar.exe"), None).unwrap();

        let same = service
            .update_game(foo.record.id(), "Foo", Path::new("/games/foo2.exe"), None)
            .unwrap();
        assert!(!same.name_collision);

        let clash = service
            .update_game(foo.record.id(), "Bar", Path::new("/games/foo2.exe"), None)
            .unwrap();
        assert!(clash.name_collision);
        assert_eq!(clash.record.id(), foo.record.id());
    }

    #[test]
    fn test_update_unknown_id() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);

        let err = service
            .update_game(&GameId::from("nope"), "Foo", Path::new("/games/foo.exe"), None)
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_edit_recomputes_hash() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let game = dir.path().join("game.exe");
        fs::write(&game, b"v1").unwrap();
        let saved = service.import_file(&game, Some("Game")).unwrap();

        fs::write(&game, b"v2").unwrap();
        let edited = service.edit_game(saved.record.id(), None, None).unwrap();

        assert_eq!(edited.record.name, "Game");
        assert_eq!(edited.record.content_hash, Some(IntegrityChecker::hash_data(b"v2")));
    }

    #[test]
    fn test_edit_to_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let game = dir.path().join("game.exe");
        fs::write(&game, b"v1").unwrap();
        let saved = service.import_file(&game, None).unwrap();

        let err = service
            .edit_game(saved.record.id(), Some("Renamed"), Some(&dir.path().join("gone.exe")))
            .unwrap_err();

        assert!(matches!(err, CatalogError::FileMissing(_)));
        assert_eq!(service.get_game(saved.record.id()).unwrap().unwrap().name, "game");
    }

    #[test]
    fn test_edit_path_keeps_latest_name() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.exe");
        let second = dir.path().join("second.exe");
        fs::write(&first, b"one").unwrap();
        fs::write(&second, b"two").unwrap();

        let service = service_in(&dir);
        let other = service_in(&dir);
        let saved = service.import_file(&first, Some("Game")).unwrap();

        other
            .update_game(saved.record.id(), "Renamed", &first, None)
            .unwrap();
        let edited = service
            .edit_game(saved.record.id(), None, Some(&second))
            .unwrap();

        assert_eq!(edited.record.name, "Renamed");
        assert_eq!(edited.record.path, second);
        assert_eq!(edited.record.content_hash, Some(IntegrityChecker::hash_data(b"two")));
    }

    #[test]
    fn test_edit_unknown_id() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let game = dir.path().join("game.exe");
        fs::write(&game, b"v1").unwrap();

        let err = service
            .edit_game(&GameId::from("nope"), Some("Foo"), Some(&game))
            .unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(_)));
        assert!(!dir.path().join("games.json").exists());
    }

    #[test]
    fn test_lookups_keep_healed_ids() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        fs::write(
            dir.path().join("games.json"),
            r#"[{"name": "Legacy", "path": "/games/legacy.exe", "is_last_selected": true}]"#,
        )
        .unwrap();

        let selected = service.get_selected().unwrap().unwrap();
        let again = service.get_selected().unwrap().unwrap();
        assert_eq!(again.id(), selected.id());
        assert_eq!(
            service.get_game(selected.id()).unwrap().unwrap().name,
            "Legacy"
        );

        service.delete_game(selected.id()).unwrap();
        assert!(service.list_games().unwrap().is_empty());
    }

    #[test]
    fn test_select_unknown_id_keeps_selection() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let foo = service.import_game("Foo", Path::new("/games/foo.exe"), None).unwrap();
        service.select_game(foo.record.id()).unwrap();

        let err = service.select_game(&GameId::from("nope")).unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(_)));
        assert_eq!(
            service.get_selected().unwrap().map(|r| r.id().clone()),
            Some(foo.record.id().clone())
        );
    }

    #[test]
    fn test_list_puts_selected_first() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let a = service.import_game("A", Path::new("/games/a.exe"), None).unwrap();
        let b = service.import_game("B", Path::new("/games/b.exe"), None).unwrap();
        let c = service.import_game("C", Path::new("/games/c.exe"), None).unwrap();

        service.select_game(c.record.id()).unwrap();
        let ids: Vec<_> = service
            .list_games()
            .unwrap()
            .into_iter()
            .map(|r| r.id().clone())
            .collect();

        assert_eq!(
            ids,
            vec![
                c.record.id().clone(),
                a.record.id().clone(),
                b.record.id().clone()
            ]
        );
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let dir = TempDir::new().unwrap();
        let service = service_in(&dir);
        let foo = service.import_game("Foo", Path::new("/games/foo.exe"), None).unwrap();
        service.select_game(foo.record.id()).unwrap();

        let removed = service.delete_game(foo.record.id()).unwrap();

        assert_eq!(removed.name, "Foo");
        assert!(service.get_selected().unwrap().is_none());
    }
}
