//! File integrity digests

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used while hashing; memory use stays flat for any file size
pub const CHUNK_SIZE: usize = 8192;

/// Lowercase hex MD5 digest of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a hex digest, normalizing it to lowercase
    pub fn new(hex: &str) -> Self {
        Self(hex.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters for compact display
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of comparing a file against a stored digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Match,
    Mismatch { actual: ContentHash },
    Unreadable,
}

/// Computes and checks file digests
pub struct IntegrityChecker;

impl IntegrityChecker {
    /// Hash a file, reporting why it could not be read
    pub fn try_hash(path: &Path) -> io::Result<ContentHash> {
        let mut file = File::open(path)?;
        let mut hasher = Md5::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(ContentHash(hex::encode(hasher.finalize())))
    }

    /// Hash a file; `None` when it is missing or unreadable
    pub fn hash(path: &Path) -> Option<ContentHash> {
        match Self::try_hash(path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::debug!("Cannot hash {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Hash in-memory data
    pub fn hash_data(data: &[u8]) -> ContentHash {
        ContentHash(hex::encode(Md5::digest(data)))
    }

    /// Compare a file against an expected digest
    pub fn verify(path: &Path, expected: &ContentHash) -> Verification {
        match Self::hash(path) {
            Some(actual) if &actual == expected => Verification::Match,
            Some(actual) => Verification::Mismatch { actual },
            None => Verification::Unreadable,
        }
    }
}
