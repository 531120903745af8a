//! JSON catalog persistence

use crate::CatalogError;
use crate::lock::CatalogLock;
use crate::record::{GameRecord, MigrationReport, RawRecord, migrate};
use anylauncher_config::CatalogLocation;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Durable storage for the game catalog.
///
/// The catalog is one JSON array rewritten whole on every change. All
/// public operations run under the catalog lock.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    catalog_path: PathBuf,
    lock: CatalogLock,
}

impl CatalogStore {
    pub fn new(
        catalog_path: impl Into<PathBuf>,
        lock_path: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            lock: CatalogLock::new(lock_path, lock_timeout),
        }
    }

    /// Store at a resolved catalog location
    pub fn open(location: &CatalogLocation, lock_timeout: Duration) -> Self {
        Self::new(location.catalog_file(), location.lock_file(), lock_timeout)
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn lock(&self) -> &CatalogLock {
        &self.lock
    }

    /// Read all records; an absent file is an empty catalog
    pub fn load(&self) -> Result<Vec<GameRecord>, CatalogError> {
        let _guard = self.lock.acquire()?;
        let (records, _) = self.read()?;
        Ok(records)
    }

    /// Replace the catalog with `records`
    pub fn save(&self, records: &[GameRecord]) -> Result<(), CatalogError> {
        let _guard = self.lock.acquire()?;
        self.write(records)
    }

    /// Run one locked load-modify-save cycle.
    ///
    /// The file is rewritten only when `mutate` succeeds; on error the
    /// catalog is left exactly as it was.
    pub fn update<T, F>(&self, mutate: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut Vec<GameRecord>) -> Result<T, CatalogError>,
    {
        let _guard = self.lock.acquire()?;
        let (mut records, _) = self.read()?;
        let value = mutate(&mut records)?;
        self.write(&records)?;
        Ok(value)
    }

    /// Read all records, persisting any repairs the migration made.
    ///
    /// A failed write-back is logged and does not fail the read.
    pub fn load_healed(&self) -> Result<Vec<GameRecord>, CatalogError> {
        let _guard = self.lock.acquire()?;
        let (records, report) = self.read()?;

        if !report.is_clean() {
            tracing::warn!(
                "Healed catalog {}: {} ids assigned, {} ids reassigned, {} fields normalized, {} selections cleared",
                self.catalog_path.display(),
                report.assigned_ids,
                report.reassigned_ids,
                report.normalized_fields,
                report.cleared_selections
            );
            if let Err(e) = self.write(&records) {
                tracing::warn!("Could not persist healed catalog: {}", e);
            }
        }

        Ok(records)
    }

    fn read(&self) -> Result<(Vec<GameRecord>, MigrationReport), CatalogError> {
        let bytes = match fs::read(&self.catalog_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok((Vec::new(), MigrationReport::default()));
            }
            Err(e) => return Err(CatalogError::io(&self.catalog_path, e)),
        };

        let json = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        let raw: Vec<RawRecord> =
            serde_json::from_slice(json).map_err(|source| CatalogError::CorruptCatalog {
                path: self.catalog_path.clone(),
                source,
            })?;

        Ok(migrate(raw))
    }

    fn write(&self, records: &[GameRecord]) -> Result<(), CatalogError> {
        if let Ok(meta) = fs::metadata(&self.catalog_path) {
            if meta.permissions().readonly() {
                return Err(CatalogError::PermissionDenied {
                    path: self.catalog_path.clone(),
                });
            }
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        records
            .serialize(&mut serializer)
            .map_err(CatalogError::Serialize)?;

        if let Some(parent) = self.catalog_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }

        // write beside the catalog and swap, so readers never see a partial file
        let partial_path = self.partial_path();
        let result = write_synced(&partial_path, &buffer)
            .and_then(|()| fs::rename(&partial_path, &self.catalog_path));

        if let Err(e) = result {
            let _ = fs::remove_file(&partial_path);
            return Err(CatalogError::io(&self.catalog_path, e));
        }

        tracing::debug!(
            "Wrote {} records to {}",
            records.len(),
            self.catalog_path.display()
        );
        Ok(())
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self
            .catalog_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        self.catalog_path.with_file_name(name)
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
