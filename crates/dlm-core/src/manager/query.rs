//! Read-side operations: state, progress, orderings, sections, positions.
//!
//! Reads flush pending index updates under the same critical section as
//! mutations, so a caller always observes a consistent ordering, never a
//! half-flushed one.

use std::path::PathBuf;

use crate::config::Settings;
use crate::index::{sections_for, Section};
use crate::task::{SortKey, SortOrder, Task, TaskKey, TaskState};

use super::DownloadManager;

/// Byte-level progress snapshot for one task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskProgress {
    pub received: u64,
    /// Total expected, -1 while unknown.
    pub expected: i64,
    /// Fraction in [0, 1]; 0 while the total is unknown.
    pub fraction: f64,
}

impl DownloadManager {
    /// State of a task, `None` for keys not in the list. Self-heals a task
    /// recorded active without a live operation before answering.
    pub fn state_of(&self, key: &str) -> Option<TaskState> {
        self.wait_ready();
        let mut inner = self.shared().inner.lock().unwrap();
        let has_op = inner.ops.contains_key(key);
        if inner.registry.self_heal(key, has_op).is_some() {
            inner.dirty.tasks = true;
        }
        inner.registry.state_of(key)
    }

    /// Snapshot of the full task record.
    pub fn task(&self, key: &str) -> Option<Task> {
        self.wait_ready();
        let inner = self.shared().inner.lock().unwrap();
        inner.registry.get(key).cloned()
    }

    pub fn progress_of(&self, key: &str) -> Option<TaskProgress> {
        self.wait_ready();
        let inner = self.shared().inner.lock().unwrap();
        let task = inner.registry.get(key)?;
        Some(TaskProgress {
            received: task.received_bytes,
            expected: task.byte_count,
            fraction: task.progress(),
        })
    }

    /// Flushed ascending ordering under one sort key.
    pub fn sorted_keys(&self, sort_key: SortKey) -> Vec<TaskKey> {
        self.wait_ready();
        self.shared().inner.lock().unwrap().ascending(sort_key)
    }

    /// Ordering under the currently configured sort key and order.
    pub fn display_list(&self) -> Vec<TaskKey> {
        self.wait_ready();
        self.shared().inner.lock().unwrap().display_order()
    }

    /// Display-ordered keys plus derived sections for a sort key.
    pub fn sections(&self, sort_key: SortKey, order: SortOrder) -> (Vec<TaskKey>, Vec<Section>) {
        self.wait_ready();
        let mut inner = self.shared().inner.lock().unwrap();
        let ascending = inner.ascending(sort_key);
        sections_for(
            &ascending,
            sort_key,
            order,
            inner.registry.tasks(),
            chrono::Local::now(),
        )
    }

    /// Final file location of the task at a display position (finished tasks
    /// only).
    pub fn location_at(&self, position: usize) -> Option<PathBuf> {
        self.wait_ready();
        let mut inner = self.shared().inner.lock().unwrap();
        let display = inner.display_order();
        let key = display.get(position)?;
        inner.registry.get(key)?.file_location.clone()
    }

    /// Keys on the trash list, oldest first.
    pub fn trash_keys(&self) -> Vec<TaskKey> {
        self.wait_ready();
        self.shared().inner.lock().unwrap().registry.trash().to_vec()
    }

    /// Keys currently denied a slot, in stack order (last pops first).
    pub fn waiting_keys(&self) -> Vec<TaskKey> {
        self.wait_ready();
        let inner = self.shared().inner.lock().unwrap();
        inner.scheduler.waiting.keys().to_vec()
    }

    /// Count of truly executing transfers.
    pub fn executing_count(&self) -> usize {
        self.wait_ready();
        self.shared().inner.lock().unwrap().scheduler.budget.running()
    }

    /// Count of transfers suspended in place.
    pub fn paused_count(&self) -> usize {
        self.wait_ready();
        self.shared().inner.lock().unwrap().scheduler.budget.paused()
    }

    /// The active limit (`None` = unbounded).
    pub fn max_concurrent(&self) -> Option<usize> {
        self.wait_ready();
        self.shared().inner.lock().unwrap().scheduler.budget.limit()
    }

    /// Pool capacity downstream of the budget (`limit + paused`).
    pub fn pool_capacity(&self) -> Option<usize> {
        self.wait_ready();
        let inner = self.shared().inner.lock().unwrap();
        inner.scheduler.budget.pool_capacity()
    }

    pub fn settings(&self) -> Settings {
        self.wait_ready();
        self.shared().inner.lock().unwrap().settings.clone()
    }

    pub fn task_count(&self) -> usize {
        self.wait_ready();
        self.shared().inner.lock().unwrap().registry.len()
    }
}
