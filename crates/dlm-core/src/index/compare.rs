//! Total-order comparators for the four sort keys.
//!
//! These orderings are load-bearing: a persisted display sequence is reused
//! verbatim on the next bootstrap, and binary insertion positions depend on
//! them, so every comparator ends in a deterministic tiebreak chain (the task
//! key last) to keep the order total.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::task::{SortKey, Task, TaskKey};

/// Numeric-aware, case-insensitive string comparison ("file2" < "file10",
/// "a" == "A" until a further character differs).
///
/// Digit runs are compared as whole numbers (leading zeros stripped for the
/// value comparison, then used as a tiebreak so the order stays total);
/// everything else is compared by lowercased characters.
pub fn natural_caseless_cmp(a: &str, b: &str) -> Ordering {
    let mut ia = a.chars().peekable();
    let mut ib = b.chars().peekable();

    loop {
        match (ia.peek().copied(), ib.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ca), Some(cb)) => {
                if ca.is_ascii_digit() && cb.is_ascii_digit() {
                    let ra = take_digit_run(&mut ia);
                    let rb = take_digit_run(&mut ib);
                    match compare_digit_runs(&ra, &rb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                let la = fold_char(ca);
                let lb = fold_char(cb);
                match la.cmp(&lb) {
                    Ordering::Equal => {
                        ia.next();
                        ib.next();
                    }
                    other => return other,
                }
            }
        }
    }
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn take_digit_run(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek() {
        if c.is_ascii_digit() {
            run.push(*c);
            it.next();
        } else {
            break;
        }
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    // More significant digits means a larger value; equal length falls back
    // to lexicographic digit comparison, then leading-zero count.
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Comparator context over the registry's metadata map. Built at each call
/// site so index maintenance always sees a consistent snapshot; the caller
/// guarantees every compared key is still present in `tasks` (indexes are
/// updated before a registry entry is purged).
pub struct TaskComparator<'a> {
    tasks: &'a HashMap<TaskKey, Task>,
    sort_key: SortKey,
}

impl<'a> TaskComparator<'a> {
    pub fn new(tasks: &'a HashMap<TaskKey, Task>, sort_key: SortKey) -> Self {
        Self { tasks, sort_key }
    }

    /// Ascending comparison of two task keys under this sort key.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let (ta, tb) = match (self.tasks.get(a), self.tasks.get(b)) {
            (Some(ta), Some(tb)) => (ta, tb),
            // Metadata already gone; keep the order total so binary search
            // still terminates.
            _ => return a.cmp(b),
        };
        let by_meta = match self.sort_key {
            SortKey::AddTime => ta.created_at.cmp(&tb.created_at),
            SortKey::Name => natural_caseless_cmp(&ta.display_name, &tb.display_name)
                .then_with(|| ta.byte_count.cmp(&tb.byte_count)),
            SortKey::Size => ta
                .byte_count
                .cmp(&tb.byte_count)
                .then_with(|| natural_caseless_cmp(&ta.display_name, &tb.display_name)),
            SortKey::Type => ta
                .file_type()
                .cmp(&tb.file_type())
                .then_with(|| natural_caseless_cmp(&ta.display_name, &tb.display_name)),
        };
        by_meta.then_with(|| a.cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::UNKNOWN_BYTE_COUNT;

    fn task(key: &str, name: &str, size: i64, created_at: i64) -> Task {
        let mut t = Task::new(key);
        t.set_display_name(name);
        t.byte_count = size;
        t.created_at = created_at;
        t
    }

    fn map(tasks: Vec<Task>) -> HashMap<TaskKey, Task> {
        tasks.into_iter().map(|t| (t.key.clone(), t)).collect()
    }

    #[test]
    fn natural_compare_orders_digit_runs_numerically() {
        assert_eq!(natural_caseless_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_caseless_cmp("file10", "file2"), Ordering::Greater);
        assert_eq!(natural_caseless_cmp("a02", "a2"), Ordering::Greater);
        assert_eq!(natural_caseless_cmp("a2", "a2"), Ordering::Equal);
    }

    #[test]
    fn natural_compare_is_case_insensitive() {
        assert_eq!(natural_caseless_cmp("ABC", "abc"), Ordering::Equal);
        assert_eq!(natural_caseless_cmp("Alpha", "beta"), Ordering::Less);
        assert_eq!(natural_caseless_cmp("beta", "ALPHA"), Ordering::Greater);
    }

    #[test]
    fn name_key_breaks_ties_by_size_then_key() {
        let tasks = map(vec![
            task("u1", "same.bin", 10, 1),
            task("u2", "same.bin", 5, 2),
        ]);
        let cmp = TaskComparator::new(&tasks, SortKey::Name);
        assert_eq!(cmp.compare("u2", "u1"), Ordering::Less);
    }

    #[test]
    fn size_key_puts_unknown_first_and_breaks_ties_by_name() {
        let tasks = map(vec![
            task("u1", "b.bin", UNKNOWN_BYTE_COUNT, 1),
            task("u2", "a.bin", 0, 2),
            task("u3", "a.bin", 100, 3),
        ]);
        let cmp = TaskComparator::new(&tasks, SortKey::Size);
        assert_eq!(cmp.compare("u1", "u2"), Ordering::Less);
        assert_eq!(cmp.compare("u2", "u3"), Ordering::Less);
    }

    #[test]
    fn type_key_orders_by_category_then_name() {
        let tasks = map(vec![
            task("u1", "song.mp3", 1, 1),
            task("u2", "movie.mkv", 1, 2),
            task("u3", "clip.mkv", 1, 3),
        ]);
        let cmp = TaskComparator::new(&tasks, SortKey::Type);
        // Video before audio; clip before movie within video.
        assert_eq!(cmp.compare("u3", "u2"), Ordering::Less);
        assert_eq!(cmp.compare("u2", "u1"), Ordering::Less);
    }

    #[test]
    fn add_time_orders_by_creation() {
        let tasks = map(vec![task("u1", "a", 1, 100), task("u2", "b", 1, 50)]);
        let cmp = TaskComparator::new(&tasks, SortKey::AddTime);
        assert_eq!(cmp.compare("u2", "u1"), Ordering::Less);
    }
}
