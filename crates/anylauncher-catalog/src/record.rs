//! Game records and the load-time migration step

use crate::integrity::ContentHash;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name given to records that were stored without one
pub const UNKNOWN_GAME_NAME: &str = "Unknown game";

/// Opaque, never-reused record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for GameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A registered game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRecord {
    id: GameId,

    /// Display name, not necessarily unique
    pub name: String,

    /// Absolute path of the executable or HTML page
    pub path: PathBuf,

    /// Digest of the file at import or last edit
    #[serde(rename = "md5")]
    pub content_hash: Option<ContentHash>,

    /// Whether this is the game the launcher starts
    #[serde(rename = "is_last_selected")]
    pub is_selected: bool,

    /// Keys written by other versions, kept as-is
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl GameRecord {
    /// Create an unselected record with a fresh id
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        content_hash: Option<ContentHash>,
    ) -> Self {
        Self {
            id: GameId::generate(),
            name: name.into(),
            path: path.into(),
            content_hash,
            is_selected: false,
            extra: Map::new(),
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unrecognized keys carried over from the catalog file
    pub fn extra_fields(&self) -> &Map<String, Value> {
        &self.extra
    }
}

/// A record as found on disk, every field optional
#[derive(Debug, Deserialize)]
pub(crate) struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    md5: Option<String>,
    #[serde(default)]
    is_last_selected: Option<bool>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// What the migration step had to repair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records stored without an id
    pub assigned_ids: usize,
    /// Records whose id duplicated an earlier record
    pub reassigned_ids: usize,
    /// Missing fields filled with defaults, or digests rewritten in lowercase
    pub normalized_fields: usize,
    /// Extra selections dropped to keep a single selected record
    pub cleared_selections: usize,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

/// Heal raw records into well-formed ones.
///
/// Runs once per load. Ids are made present and unique, missing fields get
/// defaults, and only the first selected record stays selected.
pub(crate) fn migrate(raw: Vec<RawRecord>) -> (Vec<GameRecord>, MigrationReport) {
    let mut report = MigrationReport::default();
    let mut seen = HashSet::with_capacity(raw.len());
    let mut selection_taken = false;
    let mut records = Vec::with_capacity(raw.len());

    for raw in raw {
        let id = match raw.id.filter(|id| !id.trim().is_empty()) {
            Some(id) if !seen.contains(&id) => GameId(id),
            Some(_) => {
                report.reassigned_ids += 1;
                GameId::generate()
            }
            None => {
                report.assigned_ids += 1;
                GameId::generate()
            }
        };
        seen.insert(id.0.clone());

        let name = raw.name.unwrap_or_else(|| {
            report.normalized_fields += 1;
            UNKNOWN_GAME_NAME.to_string()
        });

        let path = raw.path.unwrap_or_else(|| {
            report.normalized_fields += 1;
            PathBuf::new()
        });

        // absent and null digests are the same to us and are not counted;
        // a blank one is rewritten as null
        let content_hash = raw.md5.and_then(|hex| {
            let hash = ContentHash::new(&hex);
            let blank = hash.as_str().is_empty();
            if blank || hash.as_str() != hex {
                report.normalized_fields += 1;
            }
            (!blank).then_some(hash)
        });

        let mut is_selected = raw.is_last_selected.unwrap_or_else(|| {
            report.normalized_fields += 1;
            false
        });
        if is_selected {
            if selection_taken {
                report.cleared_selections += 1;
                is_selected = false;
            }
            selection_taken = true;
        }

        records.push(GameRecord {
            id,
            name,
            path,
            content_hash,
            is_selected,
            extra: raw.extra,
        });
    }

    (records, report)
}
