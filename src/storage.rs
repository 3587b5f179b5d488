//! Storage layer for taskmaster
//!
//! Persistence is a synchronous key-value slot store, the same model as a
//! browser's `localStorage`: each slot key maps to one string blob. The task
//! list lives in a single slot (`"todos"` by default) as a JSON array.
//!
//! # On-disk layout
//!
//! ```text
//! <data dir>/
//!   storage.json        # {"todos": "[{\"id\":…,\"task_title\":…}]"}
//!   storage.json.lock   # advisory lock held while replacing storage.json
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::schema;
use crate::task::{now_millis, TaskRecord};

/// Default slot key holding the task list
pub const TODOS_KEY: &str = "todos";

/// File name of the slot document inside the data directory
pub const STORAGE_FILE: &str = "storage.json";

/// A synchronous, string-valued key-value slot store
pub trait SlotBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Slots persisted as one JSON object on disk
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_slots(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl SlotBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let mut slots = self.read_slots()?;
        Ok(slots.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let _lock = lock::FileLock::acquire(lock::lock_path_for(&self.path), DEFAULT_LOCK_TIMEOUT_MS)?;
        // A corrupt document must not block saving; other slots are lost then.
        let mut slots = self.read_slots().unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "replacing unreadable slot document");
            BTreeMap::new()
        });
        slots.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&slots)?;
        lock::write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), key, bytes = value.len(), "slot written");
        Ok(())
    }
}

/// In-memory slots; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with one slot
    pub fn with_item(key: &str, value: &str) -> Self {
        let backend = Self::new();
        backend
            .slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        backend
    }

    /// Raw blob currently stored under `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }
}

impl SlotBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load/save capability for the whole task list
pub trait Store {
    /// Read the stored list. Never fails: unreadable data yields an empty list.
    fn load(&self) -> Vec<TaskRecord>;

    /// Replace the stored list in a single write
    fn save(&mut self, tasks: &[TaskRecord]) -> Result<()>;
}

/// [`Store`] over one slot of a [`SlotBackend`]
#[derive(Debug, Clone)]
pub struct SlotStore<B> {
    backend: B,
    key: String,
}

impl<B: SlotBackend> SlotStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_key(backend, TODOS_KEY)
    }

    pub fn with_key(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<B: SlotBackend> Store for SlotStore<B> {
    fn load(&self) -> Vec<TaskRecord> {
        let blob = match self.backend.get_item(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(key = %self.key, "no stored task list");
                return Vec::new();
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to read stored task list");
                return Vec::new();
            }
        };

        match schema::decode_blob(&blob, now_millis()) {
            Ok(decoded) => {
                debug!(
                    key = %self.key,
                    tasks = decoded.tasks.len(),
                    dropped = decoded.dropped,
                    "loaded task list"
                );
                decoded.tasks
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "stored task list is corrupt; starting empty");
                Vec::new()
            }
        }
    }

    fn save(&mut self, tasks: &[TaskRecord]) -> Result<()> {
        let blob = schema::encode_blob(tasks)?;
        self.backend.set_item(&self.key, &blob)?;
        debug!(key = %self.key, tasks = tasks.len(), "saved task list");
        Ok(())
    }
}

/// Default location of the slot document
pub fn default_storage_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "taskmaster")
        .map(|dirs| dirs.data_dir().join(STORAGE_FILE))
        .ok_or_else(|| {
            Error::OperationFailed("could not determine a data directory; pass --store".to_string())
        })
}
