//! End-to-end manager scenarios over the mock transport: admission under a
//! budget, limit changes, the index equivalence law, pause/stop/resume
//! round-trips, and deletion.

mod common;

use std::collections::HashMap;

use dlm_core::index::TaskComparator;
use dlm_core::store::{self, BlobStore, TasksBlob};
use dlm_core::task::{SortKey, Task, TaskKey, TaskState};

use common::mock_transport::RESUME_TOKEN;
use common::{harness, url, urls};

#[test]
fn running_never_exceeds_the_limit() {
    let h = harness(2);
    h.manager.admit(&urls(1..=5));

    assert_eq!(h.manager.executing_count(), 2);
    assert_eq!(h.manager.waiting_keys().len(), 3);

    // Every observable instant: after progress, after a completion, after
    // the refill that follows it.
    h.transport.connection(&url(1)).progress(10, 100);
    assert_eq!(h.manager.executing_count(), 2);

    let body = h.temp_body("t1.bin", b"abc");
    h.transport.connection(&url(1)).finish(200, 3, body);
    assert!(h.manager.executing_count() <= 2);
    assert_eq!(h.manager.executing_count(), 2);
}

#[test]
fn limit_decrease_demotes_exactly_the_excess() {
    let h = harness(3);
    h.manager.admit(&urls(1..=3));
    assert_eq!(h.manager.executing_count(), 3);

    h.manager.set_max_concurrent(1);

    assert_eq!(h.manager.executing_count(), 1);
    assert_eq!(h.manager.paused_count(), 2);
    assert_eq!(h.manager.max_concurrent(), Some(1));
    // Pool capacity grows by the suspended members: limit + paused.
    assert_eq!(h.manager.pool_capacity(), Some(3));
}

#[test]
fn limit_zero_is_unbounded_and_drains_the_queue() {
    let h = harness(1);
    h.manager.admit(&urls(1..=4));
    assert_eq!(h.manager.executing_count(), 1);
    assert_eq!(h.manager.waiting_keys().len(), 3);

    h.manager.set_max_concurrent(0);

    assert_eq!(h.manager.max_concurrent(), None);
    assert_eq!(h.manager.executing_count(), 4);
    assert!(h.manager.waiting_keys().is_empty());
}

#[test]
fn every_index_matches_a_fresh_sort_after_interleaved_mutations() {
    let h = harness(2);
    h.manager.admit(&urls(1..=6));

    // Learn sizes out of order, rename a couple, drop one.
    h.transport.connection(&url(1)).progress(0, 9_000_000);
    h.transport.connection(&url(2)).progress(0, 1_000);
    assert!(h.manager.rename(&url(3), "zeta.mkv"));
    assert!(h.manager.rename(&url(4), "Alpha.mp3"));
    h.manager.delete(&[url(5)]);

    let keys = h.manager.sorted_keys(SortKey::AddTime);
    assert_eq!(keys.len(), 5);
    let tasks: HashMap<TaskKey, Task> = keys
        .iter()
        .map(|k| (k.clone(), h.manager.task(k).unwrap()))
        .collect();

    for sort_key in SortKey::ALL {
        let cmp = TaskComparator::new(&tasks, sort_key);
        let mut expected: Vec<TaskKey> = tasks.keys().cloned().collect();
        expected.sort_by(|a, b| cmp.compare(a, b));
        assert_eq!(
            h.manager.sorted_keys(sort_key),
            expected,
            "divergence under {sort_key:?}"
        );
    }
}

#[test]
fn pause_and_resume_keep_the_same_connection_and_progress() {
    let h = harness(1);
    h.manager.admit(&[url(1)]);
    h.transport.connection(&url(1)).progress(512, 2048);

    assert_eq!(h.manager.pause(&[url(1)]), vec![url(1)]);
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Paused));
    assert_eq!(h.manager.executing_count(), 0);
    assert_eq!(h.manager.paused_count(), 1);

    h.manager.admit(&[url(1)]);
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Downloading));

    let conn = h.transport.connection(&url(1));
    assert_eq!(conn.suspends.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(conn.resumes.load(std::sync::atomic::Ordering::SeqCst), 1);
    // One handshake total: suspend/resume never tore the transfer down.
    assert_eq!(h.transport.started_order(), vec![url(1)]);

    let progress = h.manager.progress_of(&url(1)).unwrap();
    assert_eq!(progress.received, 512);
    assert_eq!(progress.expected, 2048);
}

#[test]
fn stop_keeps_the_token_and_resume_finishes_the_download() {
    let h = harness(1);
    h.manager.admit(&[url(1)]);
    h.transport.connection(&url(1)).progress(100, 1000);

    assert_eq!(h.manager.stop(&[url(1)]), vec![url(1)]);
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Stopped));
    let stopped = h.manager.task(&url(1)).unwrap();
    assert_eq!(stopped.resume_token.as_deref(), Some(RESUME_TOKEN));
    assert_eq!(stopped.received_bytes, 100);

    h.manager.admit(&[url(1)]);
    let conn = h.transport.connection(&url(1));
    assert_eq!(conn.resumed_with.as_deref(), Some(RESUME_TOKEN));
    // The token moved into the new handshake.
    assert!(h.manager.task(&url(1)).unwrap().resume_token.is_none());

    let body = h.temp_body("t1.bin", &[7u8; 1000]);
    conn.finish(206, 1000, body);

    let finished = h.manager.task(&url(1)).unwrap();
    assert_eq!(finished.state, TaskState::Finished);
    assert_eq!(finished.byte_count, 1000);
    let location = finished.file_location.expect("finished file location");
    assert_eq!(location, h.download_dir.path().join("t1.bin"));
    assert!(location.exists());
}

#[test]
fn delete_removes_from_registry_queue_and_every_index() {
    let h = harness(1);
    h.manager.admit(&urls(1..=2));
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Downloading));
    assert_eq!(h.manager.waiting_keys(), vec![url(2)]);

    let affected = h.manager.delete(&urls(1..=2));
    assert_eq!(affected.len(), 2);

    assert_eq!(h.manager.state_of(&url(1)), None);
    assert_eq!(h.manager.state_of(&url(2)), None);
    assert!(h.manager.waiting_keys().is_empty());
    assert_eq!(h.manager.executing_count(), 0);
    for sort_key in SortKey::ALL {
        assert!(h.manager.sorted_keys(sort_key).is_empty());
    }
    // Trash is on by default; both keys are parked there.
    assert_eq!(h.manager.trash_keys(), urls(1..=2));

    let conn = h.transport.connection(&url(1));
    assert_eq!(conn.cancels.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[test]
fn non_success_status_releases_the_slot_exactly_once() {
    let h = harness(2);
    h.manager.admit(&urls(1..=4));
    assert_eq!(h.manager.executing_count(), 2);

    let body = h.temp_body("t1.bin", b"half");
    h.transport.connection(&url(1)).finish(404, 4, body);

    // Failure without a token: back to pending, one slot freed, one refill.
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Pending));
    let detail = h.manager.task(&url(1)).unwrap().detail.unwrap();
    assert_eq!(detail, "HTTP 404");

    assert_eq!(h.manager.executing_count(), 2);
    let downloading = urls(1..=4)
        .iter()
        .filter(|k| h.manager.state_of(k) == Some(TaskState::Downloading))
        .count();
    assert_eq!(downloading, 2);
    assert_eq!(h.manager.state_of(&url(2)), Some(TaskState::Downloading));
    assert_eq!(h.manager.state_of(&url(4)), Some(TaskState::Downloading));
    assert_eq!(h.manager.waiting_keys(), vec![url(3)]);
}

#[test]
fn waiting_queue_serves_newest_first() {
    let h = harness(2);
    h.manager.admit(&urls(1..=5));
    assert_eq!(h.transport.started_order(), vec![url(1), url(2)]);

    let body = h.temp_body("t1.bin", b"done");
    h.transport.connection(&url(1)).finish(200, 4, body);

    // T5 was queued last, so it wins the freed slot.
    assert_eq!(h.transport.started_order(), vec![url(1), url(2), url(5)]);
    assert_eq!(h.manager.state_of(&url(5)), Some(TaskState::Downloading));
    assert_eq!(h.manager.waiting_keys(), vec![url(3), url(4)]);

    // The finished task and the new admission both hit the store.
    let bytes = h.store.load(store::TASKS_BLOB).unwrap().unwrap();
    let blob: TasksBlob = store::decode(&bytes).unwrap();
    assert_eq!(blob.tasks.len(), 5);
    let saved = blob.tasks.iter().find(|t| t.key == url(1)).unwrap();
    assert_eq!(saved.state, TaskState::Finished);
}

#[test]
fn rename_repositions_under_natural_name_order() {
    let h = harness(0);
    let a1 = "https://files.example/a1.txt".to_string();
    let a10 = "https://files.example/a10.txt".to_string();
    let b = "https://files.example/b.txt".to_string();
    h.manager.admit(&[a1.clone(), a10.clone(), b.clone()]);

    assert_eq!(
        h.manager.sorted_keys(SortKey::Name),
        vec![a1.clone(), a10.clone(), b.clone()]
    );

    assert!(h.manager.rename(&b, "a2.txt"));
    assert_eq!(h.manager.sorted_keys(SortKey::Name), vec![a1, b, a10]);
}

#[test]
fn failed_handshake_rolls_back_and_serves_the_next_candidate() {
    let h = harness(1);
    h.transport.refuse_next(&url(1));
    h.manager.admit(&urls(1..=2));

    // T1's slot was reclaimed and handed to T2 immediately.
    assert_eq!(h.manager.state_of(&url(1)), Some(TaskState::Pending));
    assert_eq!(h.manager.state_of(&url(2)), Some(TaskState::Downloading));
    assert_eq!(h.manager.executing_count(), 1);
    let detail = h.manager.task(&url(1)).unwrap().detail.unwrap();
    assert!(detail.contains("start failed"), "detail: {detail}");
}

#[test]
fn activity_observer_sees_executing_transfers() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let h = harness(1);
    let seen = Arc::new(AtomicBool::new(false));
    let seen_in_observer = Arc::clone(&seen);
    let key = url(1);
    h.manager.observe_activity(Box::new(move |samples| {
        if samples.iter().any(|s| s.key == key && s.received == 4096) {
            seen_in_observer.store(true, Ordering::SeqCst);
        }
    }));

    h.manager.admit(&[url(1)]);
    h.transport.connection(&url(1)).progress(4096, 1 << 20);

    // The tracker ticks once per second; give it two.
    for _ in 0..40 {
        if seen.load(Ordering::SeqCst) {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
    panic!("no activity sample observed");
}
