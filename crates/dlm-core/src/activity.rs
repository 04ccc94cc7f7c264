//! Activity tracker: once-per-second throughput snapshots.
//!
//! A background thread polls the executing operations' byte counters and
//! notifies registered observers with per-task samples. One trailing empty
//! snapshot is delivered when the last transfer goes quiet so observers can
//! drop their displays to zero.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::manager::Shared;
use crate::task::TaskKey;

/// One task's throughput sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySample {
    pub key: TaskKey,
    pub received: u64,
    /// Total expected, -1 while unknown.
    pub expected: i64,
    pub bytes_per_sec: u64,
}

/// Observer callback; invoked from the tracker thread. Must not register
/// further observers from within the callback.
pub type ActivityObserver = Box<dyn Fn(&[ActivitySample]) + Send + Sync>;

const TICK: Duration = Duration::from_secs(1);
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

pub(crate) fn spawn_tracker(shared: Weak<Shared>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut previous: HashMap<TaskKey, u64> = HashMap::new();
        let mut last_tick = Instant::now();
        let mut was_idle = true;

        loop {
            // Sleep in short slices so drop/shutdown is prompt.
            let mut slept = Duration::ZERO;
            while slept < TICK {
                if shutdown.load(Ordering::Acquire) {
                    return;
                }
                std::thread::sleep(SHUTDOWN_POLL);
                slept += SHUTDOWN_POLL;
            }

            let Some(shared) = shared.upgrade() else {
                return;
            };

            let elapsed = last_tick.elapsed().as_secs_f64().max(0.001);
            last_tick = Instant::now();

            let raw: Vec<(TaskKey, u64, i64)> = {
                let inner = shared.inner.lock().unwrap();
                inner
                    .ops
                    .values()
                    .filter(|op| op.is_executing())
                    .map(|op| (op.key().to_string(), op.received(), op.expected()))
                    .collect()
            };

            let samples: Vec<ActivitySample> = raw
                .iter()
                .map(|(key, received, expected)| {
                    let prev = previous.get(key).copied().unwrap_or(0);
                    let delta = received.saturating_sub(prev);
                    ActivitySample {
                        key: key.clone(),
                        received: *received,
                        expected: *expected,
                        bytes_per_sec: (delta as f64 / elapsed) as u64,
                    }
                })
                .collect();
            previous = raw
                .into_iter()
                .map(|(key, received, _)| (key, received))
                .collect();

            if samples.is_empty() && was_idle {
                continue;
            }
            was_idle = samples.is_empty();

            let observers = shared.observers.lock().unwrap();
            for observer in observers.iter() {
                observer(&samples);
            }
        }
    })
}
