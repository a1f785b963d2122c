//! On-disk artifact store and in-memory publish slot.
//!
//! Artifacts are JSON files under a cache directory. Writes go to a temporary
//! file in the same directory and are renamed over the target, so a reader
//! never sees a half-written artifact. `Published<T>` is the in-memory
//! counterpart: an index is built into a fresh value and swapped in whole.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::types::Document;

/// Identity of a collection version: size plus a content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFingerprint {
    pub doc_count: usize,
    pub digest: String,
}

impl CollectionFingerprint {
    pub fn of(docs: &[Document]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for d in docs {
            hasher.update(&d.id.to_le_bytes());
            hasher.update(d.title.as_bytes());
            hasher.update(&[0]);
            hasher.update(d.body.as_bytes());
            hasher.update(&[0]);
        }
        Self { doc_count: docs.len(), digest: hasher.finalize().to_hex().to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }
        tmp.persist(self.path(name)).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// `Ok(None)` when the artifact does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.path(name);
        if !path.is_file() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&path)?);
        let value = serde_json::from_reader(reader)
            .map_err(|e| Error::StaleCache(format!("{} is unreadable: {e}", path.display())))?;
        Ok(Some(value))
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Single-writer/many-reader slot holding a fully built value.
pub struct Published<T> {
    label: &'static str,
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Published<T> {
    pub fn empty(label: &'static str) -> Self {
        Self { label, slot: RwLock::new(None) }
    }

    /// Current value, or `IndexNotReady` if nothing has been published yet.
    pub fn get(&self) -> Result<Arc<T>> {
        self.slot
            .read()
            .clone()
            .ok_or_else(|| Error::IndexNotReady(format!("{} has not been built or loaded", self.label)))
    }

    /// Swap in a new value; readers holding the previous `Arc` keep it.
    pub fn publish(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write() = Some(Arc::clone(&value));
        value
    }

    pub fn is_ready(&self) -> bool {
        self.slot.read().is_some()
    }
}
