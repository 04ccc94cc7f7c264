//! Asynchronous bootstrap: load the four blobs, heal, seed, signal readiness.

use std::collections::HashSet;

use crate::config::{DlmConfig, Settings};
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::store;
use crate::task::TaskKey;

use super::Shared;

/// Load persisted state into the manager and release the readiness barrier.
///
/// A missing blob means first run; a corrupt or unreadable blob is logged and
/// replaced by defaults (in-memory state is authoritative from then on, and
/// the corresponding blob is rewritten on the next save trigger).
pub(crate) fn run(shared: &Shared, config: &DlmConfig) {
    let settings = match store::load_settings(shared.store.as_ref()) {
        Ok(Some(settings)) => settings,
        Ok(None) => Settings::from_config(config),
        Err(e) => {
            tracing::warn!("settings blob unreadable, using config defaults: {e}");
            Settings::from_config(config)
        }
    };

    let tasks = match store::load_tasks(shared.store.as_ref()) {
        Ok(blob) => blob.tasks,
        Err(e) => {
            tracing::warn!("tasks blob unreadable, starting empty: {e}");
            Vec::new()
        }
    };
    let trash = match store::load_trash(shared.store.as_ref()) {
        Ok(blob) => blob.keys,
        Err(e) => {
            tracing::warn!("trash blob unreadable, starting empty: {e}");
            Vec::new()
        }
    };
    let display = store::load_display(shared.store.as_ref()).unwrap_or_else(|e| {
        tracing::warn!("display blob unreadable, will rebuild: {e}");
        None
    });

    let mut registry = TaskRegistry::from_parts(tasks, trash);
    // No operations exist yet, so anything recorded active is an
    // inconsistency left by an abrupt termination.
    let healed = registry.heal_all_without_operations();
    if healed > 0 {
        tracing::info!(healed, "demoted orphaned active tasks at bootstrap");
    }

    {
        let mut inner = shared.inner.lock().unwrap();
        inner.settings = settings.clone();
        inner.scheduler = Scheduler::new(settings.max_concurrent);
        inner.registry = registry;
        if healed > 0 {
            inner.dirty.tasks = true;
        }

        // Reuse the persisted display sequence as the materialized index for
        // its sort key when it still covers exactly the live key set;
        // otherwise leave the index to rebuild lazily.
        if let Some(blob) = display {
            let live: HashSet<&TaskKey> = inner.registry.tasks().keys().collect();
            let covers = blob.keys.len() == live.len()
                && blob.keys.iter().all(|k| live.contains(k));
            if covers {
                inner.indexes.seed(blob.sort_key, blob.keys);
                tracing::debug!(sort_key = ?blob.sort_key, "seeded index from persisted display sequence");
            } else {
                tracing::debug!("persisted display sequence is stale, rebuilding lazily");
            }
        }
    }

    let mut ready = shared.ready.lock().unwrap();
    *ready = true;
    shared.ready_cv.notify_all();
    tracing::debug!("bootstrap complete");
}
