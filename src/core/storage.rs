//! Key-value snapshot storage.
//!
//! Snapshots are JSON documents addressed by a string key (the run id).
//! [`FileStore`] keeps one pretty-printed file per key inside a directory,
//! wrapped in a small versioned envelope. [`MemoryStore`] keeps everything in
//! process and counts writes, which the workflow tests use to check the
//! persist-after-every-step discipline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Envelope format version written by this build.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters that are not allowed in a snapshot key.
    #[error("Invalid snapshot key: {0:?}")]
    InvalidKey(String),

    /// Snapshot written by an incompatible version.
    #[error("Unsupported snapshot version {found} for key {key}")]
    UnsupportedVersion { key: String, found: String },
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A persistent key-value store for workflow snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Write (or overwrite) the snapshot stored under `key`.
    fn put(&self, key: &str, snapshot: &serde_json::Value) -> StoreResult<()>;

    /// Read the snapshot stored under `key`, if any.
    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>>;

    /// List all stored keys, sorted.
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Delete the snapshot under `key`. Returns whether it existed.
    fn remove(&self, key: &str) -> StoreResult<bool>;
}

/// On-disk wrapper around a snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: String,
    saved_at: DateTime<Utc>,
    data: serde_json::Value,
}

/// Directory-backed snapshot store (`<dir>/<key>.json`).
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the snapshots.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn put(&self, key: &str, snapshot: &serde_json::Value) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let envelope = Envelope {
            version: SNAPSHOT_VERSION.to_string(),
            saved_at: Utc::now(),
            data: snapshot.clone(),
        };
        let content = serde_json::to_string_pretty(&envelope)?;

        fs::create_dir_all(&self.dir)?;

        // Atomic replace: write a sibling file, then rename over the old snapshot.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(key, path = %path.display(), "Snapshot saved");
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let envelope: Envelope = serde_json::from_str(&content)?;

        if envelope.version.split('.').next() != SNAPSHOT_VERSION.split('.').next() {
            return Err(StoreError::UnsupportedVersion {
                key: key.to_string(),
                found: envelope.version,
            });
        }

        Ok(Some(envelope.data))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_key(stem).is_ok() {
                    keys.push(stem.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

/// In-process snapshot store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<BTreeMap<String, serde_json::Value>>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of successful `put` calls.
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }
}

impl SnapshotStore for MemoryStore {
    fn put(&self, key: &str, snapshot: &serde_json::Value) -> StoreResult<()> {
        validate_key(key)?;
        self.snapshots.lock().insert(key.to_string(), snapshot.clone());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.snapshots.lock().get(key).cloned())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.snapshots.lock().keys().cloned().collect())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.snapshots.lock().remove(key).is_some())
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
