//! Incremental sorted index engine.
//!
//! One [`OrderedIndex`] per sort key keeps an ascending sequence of task keys
//! alive across mutations without re-sorting: additions land in a pending set
//! and are folded in by binary insertion the next time the sequence is read,
//! removals binary-search their position (with a linear fallback), and a
//! rename/resize is a remove-then-reinsert under the affected keys only.

mod compare;
mod sections;

pub use compare::{natural_caseless_cmp, TaskComparator};
pub use sections::{sections_for, Section};

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::task::{SortKey, TaskKey};

/// Ascending ordering of task keys under one comparator, with deferred
/// incorporation of recent additions.
///
/// Invariant: when `materialized` is true and `pending` is empty, `keys` is
/// exactly the ascending ordering of all live tasks under the comparator.
#[derive(Debug, Default)]
pub struct OrderedIndex {
    keys: Vec<TaskKey>,
    materialized: bool,
    pending: HashSet<TaskKey>,
}

impl OrderedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a persisted sequence (already sorted under this key's
    /// comparator); skips the initial O(n log n) build.
    pub fn from_persisted(keys: Vec<TaskKey>) -> Self {
        Self {
            keys,
            materialized: true,
            pending: HashSet::new(),
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized
    }

    /// True when the sequence can be read without any catch-up work. Used by
    /// the scheduler to decide whether display order is available for victim
    /// selection.
    pub fn is_clean(&self) -> bool {
        self.materialized && self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Record a newly added (or restored) task. Before the first full build
    /// there is nothing to defer: the build will pick the key up anyway.
    pub fn note_added(&mut self, key: &str) {
        if self.materialized {
            self.pending.insert(key.to_string());
        }
    }

    /// Drop a key from the index. Binary search against the comparator first;
    /// a key whose position does not match (inserted under stale metadata) is
    /// found by the linear fallback. The caller must keep the key's metadata
    /// readable by `cmp` until this returns.
    pub fn forget<C>(&mut self, key: &str, cmp: C)
    where
        C: Fn(&str, &str) -> Ordering,
    {
        self.pending.remove(key);
        if !self.materialized {
            return;
        }
        match self.keys.binary_search_by(|probe| cmp(probe, key)) {
            Ok(pos) => {
                self.keys.remove(pos);
            }
            Err(_) => {
                if let Some(pos) = self.keys.iter().position(|k| k == key) {
                    self.keys.remove(pos);
                }
            }
        }
    }

    /// Flush pending additions and return the ascending sequence.
    ///
    /// The first call bulk-sorts the full live set (`all_live`); afterwards
    /// each pending key costs one binary insertion.
    pub fn sequence<A, C>(&mut self, all_live: A, cmp: C) -> &[TaskKey]
    where
        A: FnOnce() -> Vec<TaskKey>,
        C: Fn(&str, &str) -> Ordering,
    {
        if !self.materialized {
            let mut keys = all_live();
            keys.sort_by(|a, b| cmp(a, b));
            self.keys = keys;
            self.pending.clear();
            self.materialized = true;
        } else if !self.pending.is_empty() {
            let mut pending: Vec<TaskKey> = self.pending.drain().collect();
            // Deterministic flush order; the insert position only depends on
            // the comparator, this just stabilizes equal-cost traces.
            pending.sort();
            for key in pending {
                match self.keys.binary_search_by(|probe| cmp(probe, &key)) {
                    // Already present (comparators are total, so Ok means the
                    // same key); nothing to insert.
                    Ok(_) => {}
                    Err(pos) => self.keys.insert(pos, key),
                }
            }
        }
        &self.keys
    }

    /// Sequence length including not-yet-flushed additions.
    pub fn len(&self) -> usize {
        self.keys.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The materialized part without flushing. Only meaningful when
    /// [`is_clean`](Self::is_clean) holds.
    pub fn materialized_keys(&self) -> &[TaskKey] {
        &self.keys
    }
}

/// The four per-key indexes, dropped back to unmaterialized independently.
#[derive(Debug, Default)]
pub struct IndexSet {
    by_key: [OrderedIndex; 4],
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(key: SortKey) -> usize {
        match key {
            SortKey::AddTime => 0,
            SortKey::Name => 1,
            SortKey::Size => 2,
            SortKey::Type => 3,
        }
    }

    pub fn get(&self, key: SortKey) -> &OrderedIndex {
        &self.by_key[Self::slot(key)]
    }

    pub fn get_mut(&mut self, key: SortKey) -> &mut OrderedIndex {
        &mut self.by_key[Self::slot(key)]
    }

    /// Record an addition under every sort key.
    pub fn note_added_all(&mut self, key: &str) {
        for index in &mut self.by_key {
            index.note_added(key);
        }
    }

    /// Replace one index with a persisted, already-sorted sequence.
    pub fn seed(&mut self, key: SortKey, keys: Vec<TaskKey>) {
        self.by_key[Self::slot(key)] = OrderedIndex::from_persisted(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn first_sequence_call_materializes_with_bulk_sort() {
        let mut index = OrderedIndex::new();
        assert!(!index.is_materialized());
        index.note_added("c");
        let seq = index.sequence(|| vec!["c".into(), "a".into(), "b".into()], cmp);
        assert_eq!(seq, ["a", "b", "c"]);
        assert!(index.is_clean());
    }

    #[test]
    fn pending_keys_flush_by_binary_insertion() {
        let mut index = OrderedIndex::from_persisted(vec!["a".into(), "c".into()]);
        index.note_added("b");
        index.note_added("d");
        assert_eq!(index.pending_len(), 2);
        let seq = index.sequence(Vec::new, cmp);
        assert_eq!(seq, ["a", "b", "c", "d"]);
    }

    #[test]
    fn forget_removes_by_binary_search() {
        let mut index = OrderedIndex::from_persisted(vec!["a".into(), "b".into(), "c".into()]);
        index.forget("b", cmp);
        assert_eq!(index.sequence(Vec::new, cmp), ["a", "c"]);
    }

    #[test]
    fn forget_falls_back_to_linear_scan_when_misplaced() {
        // Sequence deliberately out of order for this comparator: binary
        // search cannot find "z" at its expected position.
        let mut index = OrderedIndex::from_persisted(vec!["z".into(), "a".into(), "b".into()]);
        index.forget("z", cmp);
        assert_eq!(index.materialized_keys(), ["a", "b"]);
    }

    #[test]
    fn forget_drops_pending_entries_too() {
        let mut index = OrderedIndex::from_persisted(vec!["a".into()]);
        index.note_added("b");
        index.forget("b", cmp);
        assert_eq!(index.sequence(Vec::new, cmp), ["a"]);
    }

    #[test]
    fn duplicate_pending_insert_is_ignored() {
        let mut index = OrderedIndex::from_persisted(vec!["a".into(), "b".into()]);
        index.note_added("b");
        assert_eq!(index.sequence(Vec::new, cmp), ["a", "b"]);
    }

    #[test]
    fn unmaterialized_index_defers_everything_to_the_build() {
        let mut index = OrderedIndex::new();
        index.note_added("x");
        assert_eq!(index.pending_len(), 0);
        index.forget("x", cmp);
        let seq = index.sequence(|| vec!["y".into()], cmp);
        assert_eq!(seq, ["y"]);
    }
}
