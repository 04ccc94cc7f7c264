//! Section derivation: group an already-sorted sequence into labeled buckets.
//!
//! Each sort key has a classifier whose bucket order is monotonic with the
//! comparator order, so one linear pass over the sorted sequence yields the
//! sections; nothing is ever re-sorted inside a bucket.

use chrono::{DateTime, Duration, Local};
use std::collections::HashMap;
use std::ops::Range;

use crate::task::{SortKey, SortOrder, Task, TaskKey};

/// One contiguous bucket of the display sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub label: String,
    /// Index range into the display-ordered key sequence.
    pub range: Range<usize>,
}

/// Derive the display-ordered key sequence and its sections for one sort key.
///
/// `ascending` must be the flushed ascending sequence for `sort_key`;
/// `Descending` walks it reversed. `now` is passed in so time buckets are
/// testable.
pub fn sections_for(
    ascending: &[TaskKey],
    sort_key: SortKey,
    order: SortOrder,
    tasks: &HashMap<TaskKey, Task>,
    now: DateTime<Local>,
) -> (Vec<TaskKey>, Vec<Section>) {
    let display: Vec<TaskKey> = match order {
        SortOrder::Ascending => ascending.to_vec(),
        SortOrder::Descending => ascending.iter().rev().cloned().collect(),
    };

    let bounds = DayBounds::new(now);
    let mut sections: Vec<Section> = Vec::new();
    for (i, key) in display.iter().enumerate() {
        let Some(task) = tasks.get(key) else { continue };
        let label = match sort_key {
            SortKey::AddTime => time_bucket_label(task.created_at, &bounds),
            SortKey::Name => name_bucket_label(&task.display_name),
            SortKey::Size => size_bucket_label(task.byte_count),
            SortKey::Type => task.file_type().label().to_string(),
        };
        match sections.last_mut() {
            Some(last) if last.label == label && last.range.end == i => {
                last.range.end = i + 1;
            }
            _ => sections.push(Section {
                label,
                range: i..i + 1,
            }),
        }
    }
    (display, sections)
}

/// Local-midnight boundaries used by the time classifier.
struct DayBounds {
    now_ts: i64,
    today: i64,
    yesterday: i64,
    week_ago: i64,
    month_ago: i64,
}

impl DayBounds {
    fn new(now: DateTime<Local>) -> Self {
        Self {
            now_ts: now.timestamp(),
            today: day_start_ts(now, 0),
            yesterday: day_start_ts(now, 1),
            week_ago: day_start_ts(now, 7),
            month_ago: day_start_ts(now, 30),
        }
    }
}

/// Unix timestamp of local midnight `days_back` days before `now`.
fn day_start_ts(now: DateTime<Local>, days_back: i64) -> i64 {
    let date = now.date_naive() - Duration::days(days_back);
    let midnight = date.and_hms_opt(0, 0, 0).unwrap();
    match midnight.and_local_timezone(Local) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt.timestamp(),
        chrono::LocalResult::None => midnight.and_utc().timestamp(),
    }
}

fn time_bucket_label(created_at: i64, bounds: &DayBounds) -> String {
    let label = if created_at > bounds.now_ts {
        "Future"
    } else if created_at >= bounds.today {
        "Today"
    } else if created_at >= bounds.yesterday {
        "Yesterday"
    } else if created_at >= bounds.week_ago {
        "Last 7 Days"
    } else if created_at >= bounds.month_ago {
        "Last 30 Days"
    } else {
        "Older"
    };
    label.to_string()
}

const MB: i64 = 1_000_000;
const GB: i64 = 1_000_000_000;

/// Five fixed size bands; an unknown size (-1) falls into the smallest band.
fn size_bucket_label(byte_count: i64) -> String {
    let label = if byte_count < MB {
        "Smaller than 1 MB"
    } else if byte_count < 10 * MB {
        "1 - 10 MB"
    } else if byte_count < 100 * MB {
        "10 - 100 MB"
    } else if byte_count < GB {
        "100 MB - 1 GB"
    } else {
        "Larger than 1 GB"
    };
    label.to_string()
}

/// Leading-character bucket: uppercased first alphabetic char, else "#".
fn name_bucket_label(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => c.to_uppercase().to_string(),
        _ => "#".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn size_sections_follow_the_five_bands() {
        let tasks = map(vec![
            task("u1", "a", -1, 1),
            task("u2", "b", 5 * MB, 2),
            task("u3", "c", 50 * MB, 3),
            task("u4", "d", 2 * GB, 4),
        ]);
        let ascending: Vec<TaskKey> =
            vec!["u1".into(), "u2".into(), "u3".into(), "u4".into()];
        let (display, sections) =
            sections_for(&ascending, SortKey::Size, SortOrder::Ascending, &tasks, noon());
        assert_eq!(display, ascending);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            ["Smaller than 1 MB", "1 - 10 MB", "10 - 100 MB", "Larger than 1 GB"]
        );
        assert_eq!(sections[0].range, 0..1);
        assert_eq!(sections[3].range, 3..4);
    }

    #[test]
    fn time_sections_split_on_local_midnights() {
        let now = noon();
        let today = now.timestamp() - 3600;
        let yesterday = now.timestamp() - 86_400;
        let old = now.timestamp() - 90 * 86_400;
        let future = now.timestamp() + 3600;
        let tasks = map(vec![
            task("u1", "a", 1, old),
            task("u2", "b", 1, yesterday),
            task("u3", "c", 1, today),
            task("u4", "d", 1, future),
        ]);
        let ascending: Vec<TaskKey> =
            vec!["u1".into(), "u2".into(), "u3".into(), "u4".into()];
        let (_, sections) =
            sections_for(&ascending, SortKey::AddTime, SortOrder::Ascending, &tasks, now);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Older", "Yesterday", "Today", "Future"]);
    }

    #[test]
    fn descending_order_reverses_sequence_and_sections() {
        let tasks = map(vec![task("u1", "alpha", 1, 1), task("u2", "beta", 1, 2)]);
        let ascending: Vec<TaskKey> = vec!["u1".into(), "u2".into()];
        let (display, sections) =
            sections_for(&ascending, SortKey::Name, SortOrder::Descending, &tasks, noon());
        assert_eq!(display, vec!["u2".to_string(), "u1".to_string()]);
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["B", "A"]);
    }

    #[test]
    fn name_sections_bucket_non_alphabetic_as_hash() {
        let tasks = map(vec![
            task("u1", "1st.bin", 1, 1),
            task("u2", "alpha.bin", 1, 2),
            task("u3", "Avocado.bin", 1, 3),
        ]);
        let ascending: Vec<TaskKey> = vec!["u1".into(), "u2".into(), "u3".into()];
        let (_, sections) =
            sections_for(&ascending, SortKey::Name, SortOrder::Ascending, &tasks, noon());
        let labels: Vec<&str> = sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["#", "A"]);
        assert_eq!(sections[1].range, 1..3);
    }
}
