//! Transport capability consumed by the scheduler.
//!
//! The actual resumable-HTTP machinery lives outside this crate; the manager
//! only needs start/suspend/resume/cancel plus an event sink per task. Events
//! may be delivered from any thread; the manager funnels them back into its
//! critical section.

use std::path::PathBuf;
use std::sync::Arc;

/// Callback installed per task; receives every event for that transfer.
pub type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// What a transfer reports back.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Periodic progress at transport-determined intervals.
    Progress {
        bytes_written: u64,
        total_written: u64,
        /// Total expected, -1 while unknown.
        total_expected: i64,
    },
    /// Transfer completed; success is decided by the status code ([200, 206]).
    Finished {
        status: u16,
        byte_count: i64,
        temp_file: PathBuf,
    },
    /// Transfer failed. A resume token, when offered, allows restarting
    /// without re-downloading completed bytes.
    Failed {
        detail: String,
        resume_token: Option<Vec<u8>>,
        received: u64,
    },
    /// Asynchronous result of `cancel_for_resume`; `None` when the transport
    /// had nothing resumable to offer.
    ResumeToken(Option<Vec<u8>>),
}

/// Handle to one in-flight transfer.
pub trait TransportHandle: Send {
    /// Suspend in place; the transfer can continue without a new handshake.
    fn suspend(&mut self);
    /// Continue a suspended transfer.
    fn resume(&mut self);
    /// Hard cancel; no resume token wanted.
    fn cancel(&mut self);
    /// Cancel and produce a resume token asynchronously through the sink.
    fn cancel_for_resume(&mut self);
}

/// Factory for transfers. One instance is shared by a manager.
pub trait Transport: Send + Sync {
    /// Start a fresh transfer for `url`.
    fn start(&self, url: &str, events: EventSink) -> anyhow::Result<Box<dyn TransportHandle>>;

    /// Start a transfer continuing from a previously produced resume token.
    fn start_resumed(
        &self,
        url: &str,
        token: &[u8],
        events: EventSink,
    ) -> anyhow::Result<Box<dyn TransportHandle>>;
}

/// Success window for the final HTTP status of a completed transfer.
pub fn status_is_success(status: u16) -> bool {
    (200..=206).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_window() {
        assert!(status_is_success(200));
        assert!(status_is_success(206));
        assert!(!status_is_success(199));
        assert!(!status_is_success(207));
        assert!(!status_is_success(404));
    }
}
