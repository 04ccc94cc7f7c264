//! Shared scenario-test harness: manager + mock transport + memory store.

pub mod mock_transport;

use std::path::PathBuf;
use std::sync::Arc;

use dlm_core::config::DlmConfig;
use dlm_core::manager::DownloadManager;
use dlm_core::store::{BlobStore, MemoryBlobStore};
use dlm_core::transport::Transport;

use mock_transport::MockTransport;

pub struct Harness {
    pub manager: DownloadManager,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryBlobStore>,
    pub download_dir: tempfile::TempDir,
}

/// Manager over a memory store and mock transport, already past bootstrap.
pub fn harness(max_concurrent: usize) -> Harness {
    let store = Arc::new(MemoryBlobStore::new());
    let transport = Arc::new(MockTransport::new());
    let download_dir = tempfile::tempdir().unwrap();
    let config = DlmConfig {
        max_concurrent,
        download_dir: Some(download_dir.path().to_path_buf()),
        ..DlmConfig::default()
    };
    let store_dyn: Arc<dyn BlobStore> = store.clone();
    let transport_dyn: Arc<dyn Transport> = transport.clone();
    let manager = DownloadManager::open(store_dyn, transport_dyn, &config);
    manager.wait_ready();
    Harness {
        manager,
        transport,
        store,
        download_dir,
    }
}

impl Harness {
    /// Write a temp file the mock transport can hand over as a finished body.
    pub fn temp_body(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.download_dir.path().join(format!("{name}.part"));
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

pub fn url(n: usize) -> String {
    format!("https://files.example/t{n}.bin")
}

pub fn urls(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(url).collect()
}
