//! Waiting queue: admissible tasks currently denied a slot.
//!
//! Served as a stack so the most recently queued task starts first ("newest
//! requested, soonest started"), except for bulk resume-all, which re-queues
//! in display order so the visible top of the list is served first.

use crate::task::TaskKey;

#[derive(Debug, Default)]
pub struct WaitingQueue {
    // Stack: push/pop at the back.
    keys: Vec<TaskKey>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a key onto the top of the stack. A key already queued is moved to
    /// the top rather than duplicated.
    pub fn push(&mut self, key: &str) {
        self.remove(key);
        self.keys.push(key.to_string());
    }

    /// Pop the most recently queued key.
    pub fn pop(&mut self) -> Option<TaskKey> {
        self.keys.pop()
    }

    /// Unconditional removal (stop/delete). Returns whether the key was queued.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(pos) => {
                self.keys.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys bottom-to-top of the stack (last entry pops first).
    pub fn keys(&self) -> &[TaskKey] {
        &self.keys
    }

    /// Queue a batch so it pops in the given order (used by resume-all, where
    /// `keys` is the display order). Entries already queued are re-positioned.
    pub fn push_serving_order(&mut self, keys: impl IntoIterator<Item = TaskKey>) {
        let ordered: Vec<TaskKey> = keys.into_iter().collect();
        for key in ordered.iter().rev() {
            self.push(key);
        }
        // After pushing reversed, the first of `ordered` sits on top.
    }

    pub fn clear(&mut self) -> Vec<TaskKey> {
        std::mem::take(&mut self.keys)
    }
}
