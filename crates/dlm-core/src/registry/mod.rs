//! Task registry: canonical per-task state plus the trash list.
//!
//! The registry is plain data behind the manager's critical section; the
//! transition helpers here keep the token/location invariant and the failure
//! policy in one place.

use std::collections::HashMap;

use crate::task::{Task, TaskKey, TaskState};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskKey, Task>,
    /// Parallel, simpler ordered list of deleted task keys (newest last).
    trash: Vec<TaskKey>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted snapshots.
    pub fn from_parts(tasks: Vec<Task>, trash: Vec<TaskKey>) -> Self {
        Self {
            tasks: tasks.into_iter().map(|t| (t.key.clone(), t)).collect(),
            trash,
        }
    }

    /// The metadata map; comparators borrow this.
    pub fn tasks(&self) -> &HashMap<TaskKey, Task> {
        &self.tasks
    }

    pub fn get(&self, key: &str) -> Option<&Task> {
        self.tasks.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Task> {
        self.tasks.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Live keys in map iteration order (callers needing an ordering go
    /// through the index engine).
    pub fn keys(&self) -> Vec<TaskKey> {
        self.tasks.keys().cloned().collect()
    }

    pub fn state_of(&self, key: &str) -> Option<TaskState> {
        self.tasks.get(key).map(|t| t.state)
    }

    /// Insert a task; refuses duplicates.
    pub fn insert(&mut self, task: Task) -> bool {
        if self.tasks.contains_key(&task.key) {
            return false;
        }
        self.tasks.insert(task.key.clone(), task);
        true
    }

    /// Purge a task record outright.
    pub fn remove(&mut self, key: &str) -> Option<Task> {
        self.tasks.remove(key)
    }

    /// Remove the record and park the key on the trash list.
    pub fn move_to_trash(&mut self, key: &str) -> Option<Task> {
        let task = self.tasks.remove(key)?;
        if !self.trash.iter().any(|k| k == key) {
            self.trash.push(key.to_string());
        }
        Some(task)
    }

    pub fn trash(&self) -> &[TaskKey] {
        &self.trash
    }

    /// Drop a key from the trash list (its own lifecycle, nothing else moves).
    pub fn purge_from_trash(&mut self, key: &str) -> bool {
        match self.trash.iter().position(|k| k == key) {
            Some(pos) => {
                self.trash.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Apply the transport failure policy: with a resume token the task
    /// becomes `Stopped` and keeps the token; without one it returns to
    /// `Pending` with zero progress. The detail string is kept either way.
    pub fn fail(&mut self, key: &str, detail: &str, token: Option<Vec<u8>>, received: u64) -> bool {
        let Some(task) = self.tasks.get_mut(key) else {
            return false;
        };
        task.detail = Some(detail.to_string());
        match token {
            Some(token) => {
                task.state = TaskState::Stopped;
                task.received_bytes = received;
                task.set_resume_token(token);
            }
            None => task.reset_to_pending(),
        }
        true
    }

    /// Successful completion: record the final size and file location.
    pub fn finish(&mut self, key: &str, byte_count: i64, location: std::path::PathBuf) -> bool {
        match self.tasks.get_mut(key) {
            Some(task) => {
                task.complete(byte_count, location);
                true
            }
            None => false,
        }
    }

    /// Detected-inconsistency repair: a task recorded active with no live
    /// operation (e.g. after abrupt termination) is demoted to `Stopped` when
    /// it holds a resume token, else to `Pending`. Returns the healed state.
    pub fn self_heal(&mut self, key: &str, has_operation: bool) -> Option<TaskState> {
        let task = self.tasks.get_mut(key)?;
        if has_operation || !task.state.is_active() {
            return None;
        }
        let healed = if task.resume_token.is_some() {
            TaskState::Stopped
        } else {
            task.received_bytes = 0;
            TaskState::Pending
        };
        tracing::warn!(key, from = ?task.state, to = ?healed, "healing task without operation");
        task.state = healed;
        Some(healed)
    }

    /// Bootstrap-time pass of [`self_heal`](Self::self_heal) over every task.
    pub fn heal_all_without_operations(&mut self) -> usize {
        let keys: Vec<TaskKey> = self
            .tasks
            .values()
            .filter(|t| t.state.is_active())
            .map(|t| t.key.clone())
            .collect();
        let mut healed = 0;
        for key in keys {
            if self.self_heal(&key, false).is_some() {
                healed += 1;
            }
        }
        healed
    }

    /// Count of tasks in a given state.
    pub fn count_in_state(&self, state: TaskState) -> usize {
        self.tasks.values().filter(|t| t.state == state).count()
    }
}
