//! Per-task unit of work bridging registry state to the transport.
//!
//! The wrapper owns the transport handle and exposes the observable flags the
//! admission controller reads. All transport calls on the handle happen
//! outside the manager's critical section; the flags are atomics so readers
//! never need the handle lock.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::task::TaskKey;
use crate::transport::TransportHandle;

/// Wraps one task's transport lifecycle.
pub struct TaskOperation {
    key: TaskKey,
    handle: Mutex<Option<Box<dyn TransportHandle>>>,
    started: AtomicBool,
    executing: AtomicBool,
    finished: AtomicBool,
    cancelled: AtomicBool,
    received: AtomicU64,
    expected: AtomicI64,
}

impl TaskOperation {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            handle: Mutex::new(None),
            started: AtomicBool::new(false),
            executing: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            received: AtomicU64::new(0),
            expected: AtomicI64::new(crate::task::UNKNOWN_BYTE_COUNT),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Attach the transport handle produced for this task. If `cancel` won
    /// the race (delete during handshake), the handle is retired immediately
    /// instead of executing.
    pub fn start(&self, mut handle: Box<dyn TransportHandle>) {
        if self.cancelled.load(Ordering::Acquire) || self.finished.load(Ordering::Acquire) {
            handle.cancel();
            self.finished.store(true, Ordering::Release);
            return;
        }
        self.started.store(true, Ordering::Release);
        self.executing.store(true, Ordering::Release);
        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Suspend in place. Returns false when there is nothing executing.
    pub fn suspend(&self) -> bool {
        if self.finished.load(Ordering::Acquire) || !self.executing.load(Ordering::Acquire) {
            return false;
        }
        if let Some(handle) = self.handle.lock().unwrap().as_mut() {
            handle.suspend();
            self.executing.store(false, Ordering::Release);
            return true;
        }
        false
    }

    /// Continue a suspended transfer. Only valid after `start`.
    pub fn resume_transfer(&self) -> bool {
        if self.finished.load(Ordering::Acquire) || !self.started.load(Ordering::Acquire) {
            return false;
        }
        if let Some(handle) = self.handle.lock().unwrap().as_mut() {
            handle.resume();
            self.executing.store(true, Ordering::Release);
            return true;
        }
        false
    }

    /// Tear down the transfer, requesting a resume token (delivered later
    /// through the event sink). Idempotent.
    pub fn stop(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.executing.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().unwrap().as_mut() {
            handle.cancel_for_resume();
        }
    }

    /// Hard cancel; no resume token wanted. Idempotent.
    pub fn delete(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.executing.store(false, Ordering::Release);
        if let Some(handle) = self.handle.lock().unwrap().as_mut() {
            handle.cancel();
        }
    }

    /// Prevent a not-yet-started wrapper from ever running. Safe to call at
    /// any time: after `start` it degrades to `delete`.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if self.started.load(Ordering::Acquire) {
            self.delete();
        }
    }

    /// Completion observed through the event sink (no handle call needed).
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
        self.executing.store(false, Ordering::Release);
    }

    pub fn note_progress(&self, total_written: u64, total_expected: i64) {
        self.received.store(total_written, Ordering::Relaxed);
        self.expected.store(total_expected, Ordering::Relaxed);
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn expected(&self) -> i64 {
        self.expected.load(Ordering::Relaxed)
    }
}
