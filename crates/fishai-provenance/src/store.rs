//! Provenance log persistence layer
//!
//! Keeps the most recent classification records in a single JSON document:
//! - most-recent-first ordering, capped at a configured length
//! - one serialized writer per store (read-modify-write under a mutex)
//! - atomic replace via a temp file in the same directory, so readers never
//!   observe a partially written document

use fishai_core::{ClassificationRecord, Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Configuration for the provenance log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON document holding the records
    pub path: PathBuf,

    /// Maximum number of retained records
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("storage/metadata.json"),
            capacity: default_capacity(),
        }
    }
}

fn default_capacity() -> usize {
    50
}

/// Bounded, most-recent-first log of classification records
pub struct ProvenanceStore {
    config: StoreConfig,
    write_lock: Mutex<()>,
}

impl ProvenanceStore {
    /// Create a store over `config.path`; the file is created on first append
    pub fn new(mut config: StoreConfig) -> Self {
        config.capacity = config.capacity.max(1);
        info!(
            "Provenance log at {:?} (keeping {} records)",
            config.path, config.capacity
        );
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Shorthand for [`ProvenanceStore::new`]
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self::new(StoreConfig {
            path: path.into(),
            capacity,
        })
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Maximum number of retained records
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Insert `record` at the head and drop anything beyond the capacity.
    ///
    /// Concurrent appends are strictly ordered; none are lost.
    pub fn append(&self, record: &ClassificationRecord) -> Result<()> {
        if record.image_url.is_none() {
            return Err(Error::internal(format!(
                "refusing to log record {} before its upload is stored",
                record.id
            )));
        }

        let _guard = self.write_lock.lock();

        let mut items = self.read_all()?;
        if items.iter().any(|r| r.id == record.id) {
            return Err(Error::storage(format!("record {} is already logged", record.id)));
        }

        items.insert(0, record.clone());
        let evicted = items.len().saturating_sub(self.config.capacity);
        items.truncate(self.config.capacity);
        self.write_all(&items)?;

        debug!(id = %record.id, retained = items.len(), evicted, "Appended provenance record");
        Ok(())
    }

    /// Up to `limit` records, most recent first
    pub fn list_recent(&self, limit: usize) -> Result<Vec<ClassificationRecord>> {
        let mut items = self.read_all()?;
        items.truncate(limit);
        Ok(items)
    }

    /// Number of currently retained records
    pub fn count(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    /// Read the whole document; a missing or blank file is an empty log
    fn read_all(&self) -> Result<Vec<ClassificationRecord>> {
        let path = &self.config.path;
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::storage(format!(
                    "failed to read provenance log {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            Error::storage(format!(
                "provenance log {} is corrupt and needs operator attention: {}",
                path.display(),
                e
            ))
        })
    }

    /// Replace the document atomically
    fn write_all(&self, items: &[ClassificationRecord]) -> Result<()> {
        let path = &self.config.path;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| storage_io("create", dir, e))?;

        let mut tmp =
            NamedTempFile::new_in(dir).map_err(|e| storage_io("create temp file in", dir, e))?;
        serde_json::to_writer_pretty(&mut tmp, items)?;
        tmp.write_all(b"\n").map_err(|e| storage_io("write", tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| storage_io("sync", tmp.path(), e))?;

        tmp.persist(path)
            .map_err(|e| storage_io("replace", path, e.error))?;
        Ok(())
    }
}

fn storage_io(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::storage(format!("failed to {} {}: {}", action, path.display(), e))
}
