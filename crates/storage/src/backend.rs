//! Raw key/value backends.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use crate::error::StorageError;

/// String key/value persistence (the browser-storage equivalent).
///
/// Backends store opaque strings; encoding is the store's concern.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-lifetime backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, bypassing decoding (for inspection and tests).
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::backend("memory backend lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::backend("memory backend lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::backend("memory backend lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

/// Backend persisted as a single JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    /// Open (or lazily create) a backend stored at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create storage directory at {parent:?}"))?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<HashMap<String, String>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read storage file {:?}", self.path));
            }
        };
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("storage file {:?} is not a JSON object", self.path))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        let tmp = self.path.with_extension("tmp");
        let text = serde_json::to_string(entries).context("failed to serialize storage file")?;
        std::fs::write(&tmp, text).with_context(|| format!("failed to write {tmp:?}"))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace storage file {:?}", self.path))?;
        Ok(())
    }

    /// Read the file, treating a corrupt file as empty so writes can recover it.
    fn read_for_update(&self) -> HashMap<String, String> {
        match self.read_all() {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!("storage file unreadable, starting from empty: {err:?}");
                HashMap::new()
            }
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::backend("file backend lock poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::backend("file backend lock poisoned"))?;
        let mut entries = self.read_for_update();
        entries.insert(key.to_string(), value);
        self.write_all(&entries)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StorageError::backend("file backend lock poisoned"))?;
        let mut entries = self.read_for_update();
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
