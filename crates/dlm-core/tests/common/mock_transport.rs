//! Deterministic in-process transport for manager scenario tests.
//!
//! Every `start` records a connection the test can drive by firing progress,
//! completion, and failure events through the task's sink. `cancel_for_resume`
//! delivers the configured resume token synchronously, like a transport that
//! flushes its state on teardown.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dlm_core::transport::{EventSink, Transport, TransportEvent, TransportHandle};

pub const RESUME_TOKEN: &[u8] = b"resume-tok";

/// One accepted transfer; fire events on it to drive the manager.
pub struct Connection {
    sink: EventSink,
    /// Token passed to `start_resumed`, `None` for a fresh start.
    pub resumed_with: Option<Vec<u8>>,
    pub suspends: AtomicUsize,
    pub resumes: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl Connection {
    pub fn progress(&self, total_written: u64, total_expected: i64) {
        (self.sink)(TransportEvent::Progress {
            bytes_written: total_written,
            total_written,
            total_expected,
        });
    }

    pub fn finish(&self, status: u16, byte_count: i64, temp_file: PathBuf) {
        (self.sink)(TransportEvent::Finished {
            status,
            byte_count,
            temp_file,
        });
    }

    pub fn fail(&self, detail: &str, resume_token: Option<Vec<u8>>, received: u64) {
        (self.sink)(TransportEvent::Failed {
            detail: detail.to_string(),
            resume_token,
            received,
        });
    }
}

struct MockHandle {
    conn: Arc<Connection>,
    stop_token: Option<Vec<u8>>,
}

impl TransportHandle for MockHandle {
    fn suspend(&mut self) {
        self.conn.suspends.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.conn.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&mut self) {
        self.conn.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_for_resume(&mut self) {
        self.conn.cancels.fetch_add(1, Ordering::SeqCst);
        (self.conn.sink)(TransportEvent::ResumeToken(self.stop_token.take()));
    }
}

#[derive(Default)]
pub struct MockTransport {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    started: Mutex<Vec<String>>,
    refuse: Mutex<HashSet<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs handed to `start`/`start_resumed`, in call order.
    pub fn started_order(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Latest connection for a URL; panics when the transfer never started.
    pub fn connection(&self, url: &str) -> Arc<Connection> {
        Arc::clone(
            self.connections
                .lock()
                .unwrap()
                .get(url)
                .unwrap_or_else(|| panic!("no connection for {url}")),
        )
    }

    /// Make the next `start` for this URL fail its handshake.
    pub fn refuse_next(&self, url: &str) {
        self.refuse.lock().unwrap().insert(url.to_string());
    }

    fn connect(
        &self,
        url: &str,
        sink: EventSink,
        resumed_with: Option<Vec<u8>>,
    ) -> anyhow::Result<Box<dyn TransportHandle>> {
        if self.refuse.lock().unwrap().remove(url) {
            anyhow::bail!("handshake refused for {url}");
        }
        let conn = Arc::new(Connection {
            sink,
            resumed_with,
            suspends: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        });
        self.connections
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::clone(&conn));
        self.started.lock().unwrap().push(url.to_string());
        Ok(Box::new(MockHandle {
            conn,
            stop_token: Some(RESUME_TOKEN.to_vec()),
        }))
    }
}

impl Transport for MockTransport {
    fn start(&self, url: &str, events: EventSink) -> anyhow::Result<Box<dyn TransportHandle>> {
        self.connect(url, events, None)
    }

    fn start_resumed(
        &self,
        url: &str,
        token: &[u8],
        events: EventSink,
    ) -> anyhow::Result<Box<dyn TransportHandle>> {
        self.connect(url, events, Some(token.to_vec()))
    }
}
