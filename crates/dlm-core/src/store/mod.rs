//! Persistence capability: an opaque named-blob store.
//!
//! The manager persists four independent blobs (task metadata, the display
//! sequence snapshot, the trash list, and the settings record), each guarded
//! by its own dirty flag. A failed save keeps the flag set so the next
//! trigger retries; in-memory state stays authoritative throughout.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Settings;
use crate::task::{SortKey, SortOrder, Task, TaskKey};

pub const TASKS_BLOB: &str = "tasks";
pub const DISPLAY_BLOB: &str = "display";
pub const TRASH_BLOB: &str = "trash";
pub const SETTINGS_BLOB: &str = "settings";

/// Blob store errors; callers usually just log and carry on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("blob io: {0}")]
    Io(#[from] std::io::Error),
    #[error("blob codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Narrow persistence interface consumed by the manager.
pub trait BlobStore: Send + Sync {
    /// Load a named blob; `None` when it has never been saved.
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Save a named blob atomically enough for our purposes.
    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// One file per blob under a state directory
/// (default `~/.local/state/dlm/`).
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Open (and create) the state directory. Failure here is the one fatal
    /// bootstrap condition: without local storage nothing can persist.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Default state directory via XDG.
    pub fn default_dir() -> anyhow::Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("dlm")?;
        Ok(xdg_dirs.get_state_home().join("dlm"))
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobStore for FsBlobStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral managers.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().unwrap().get(name).cloned())
    }

    fn save(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Snapshot of the task metadata map.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksBlob {
    pub tasks: Vec<Task>,
}

/// Snapshot of the ascending sequence for the persisted sort key; reused on
/// bootstrap as the already-materialized index so the first query skips the
/// O(n log n) build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayBlob {
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub keys: Vec<TaskKey>,
}

/// Snapshot of the trash list (ordered task keys, independent lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrashBlob {
    pub keys: Vec<TaskKey>,
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Per-blob dirty accounting. A flag is cleared only after a successful save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub tasks: bool,
    pub display: bool,
    pub trash: bool,
    pub settings: bool,
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.tasks || self.display || self.trash || self.settings
    }
}

/// Typed load helpers; a missing blob yields the default.
pub fn load_settings(store: &dyn BlobStore) -> Result<Option<Settings>, StoreError> {
    Ok(match store.load(SETTINGS_BLOB)? {
        Some(bytes) => Some(decode(&bytes)?),
        None => None,
    })
}

pub fn load_tasks(store: &dyn BlobStore) -> Result<TasksBlob, StoreError> {
    Ok(match store.load(TASKS_BLOB)? {
        Some(bytes) => decode(&bytes)?,
        None => TasksBlob::default(),
    })
}

pub fn load_trash(store: &dyn BlobStore) -> Result<TrashBlob, StoreError> {
    Ok(match store.load(TRASH_BLOB)? {
        Some(bytes) => decode(&bytes)?,
        None => TrashBlob::default(),
    })
}

pub fn load_display(store: &dyn BlobStore) -> Result<Option<DisplayBlob>, StoreError> {
    Ok(match store.load(DISPLAY_BLOB)? {
        Some(bytes) => Some(decode(&bytes)?),
        None => None,
    })
}
