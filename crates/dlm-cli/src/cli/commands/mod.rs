//! CLI command handlers. Each command is in its own file.

mod add;
mod limit;
mod list;
mod remove;
mod rename;
mod status;
mod trash;

pub use add::run_add;
pub use limit::run_limit;
pub use list::run_list;
pub use remove::run_remove;
pub use rename::run_rename;
pub use status::run_status;
pub use trash::run_trash;

use anyhow::Result;
use std::collections::HashMap;

use dlm_core::config::{DlmConfig, Settings};
use dlm_core::index::TaskComparator;
use dlm_core::store::{self, BlobStore, FsBlobStore};
use dlm_core::task::{SortKey, Task, TaskKey};

/// Open the blob store the manager persists into.
pub fn open_store(cfg: &DlmConfig) -> Result<FsBlobStore> {
    let dir = match &cfg.state_dir {
        Some(dir) => dir.clone(),
        None => FsBlobStore::default_dir()?,
    };
    Ok(FsBlobStore::open(dir)?)
}

/// Persisted settings, or config-derived defaults when none were saved yet.
pub(crate) fn settings_or_default(store: &dyn BlobStore, cfg: &DlmConfig) -> Result<Settings> {
    Ok(store::load_settings(store)?.unwrap_or_else(|| Settings::from_config(cfg)))
}

/// Task metadata keyed for comparator lookups.
pub(crate) fn task_map(tasks: Vec<Task>) -> HashMap<TaskKey, Task> {
    tasks.into_iter().map(|t| (t.key.clone(), t)).collect()
}

/// Full sort of the live keys; the offline CLI has no index to reuse.
pub(crate) fn ascending_keys(tasks: &HashMap<TaskKey, Task>, sort_key: SortKey) -> Vec<TaskKey> {
    let cmp = TaskComparator::new(tasks, sort_key);
    let mut keys: Vec<TaskKey> = tasks.keys().cloned().collect();
    keys.sort_by(|a, b| cmp.compare(a, b));
    keys
}

/// Human-oriented size column ("-" while unknown).
pub(crate) fn size_column(byte_count: i64) -> String {
    if byte_count < 0 {
        "-".to_string()
    } else {
        byte_count.to_string()
    }
}
