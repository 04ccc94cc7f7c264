//! Task data model: per-download state, metadata, and sort parameters.
//!
//! A task is identified by its download URL (the [`TaskKey`]). The registry
//! owns the canonical `Task` record; everything else (indexes, scheduler,
//! operations) refers to tasks by key.

mod file_type;

pub use file_type::FileType;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique task identifier: the download URL.
pub type TaskKey = String;

/// Sentinel for a total size the server has not reported yet.
pub const UNKNOWN_BYTE_COUNT: i64 = -1;

/// Lifecycle state of one download task.
///
/// `Paused` means the transport is suspended in place and can continue
/// without a new handshake; `Stopped` means the transport was torn down and
/// a resume token (if any) is held in the task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Downloading,
    Paused,
    Stopped,
    Finished,
}

impl TaskState {
    /// True for states that conceptually hold a transport slot.
    pub fn is_active(self) -> bool {
        matches!(self, TaskState::Downloading | TaskState::Paused)
    }
}

/// Which ordering of the task set a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    AddTime,
    Name,
    Size,
    Type,
}

impl SortKey {
    /// All supported keys, in a fixed iteration order.
    pub const ALL: [SortKey; 4] = [SortKey::AddTime, SortKey::Name, SortKey::Size, SortKey::Type];
}

/// Direction applied on top of the maintained ascending sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Canonical per-task record.
///
/// Invariant: at most one of `resume_token` / `file_location` is set.
/// `resume_token` only carries meaning in `Stopped`, `file_location` only in
/// `Finished`; the transition helpers below keep that true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub key: TaskKey,
    pub state: TaskState,
    /// Unix seconds at creation; effectively unique, used by the add-time sort.
    pub created_at: i64,
    pub display_name: String,
    /// Lowercased extension of `display_name` ("" when none).
    pub file_extension: String,
    /// Total size in bytes; [`UNKNOWN_BYTE_COUNT`] until the server reports it.
    pub byte_count: i64,
    pub received_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_token: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_location: Option<PathBuf>,
    /// Human-readable detail for the last transport failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Task {
    /// Create a fresh `Pending` task for a URL, deriving the display name
    /// from the last URL path segment.
    pub fn new(key: &str) -> Self {
        let display_name = display_name_from_url(key);
        let file_extension = extension_of(&display_name);
        Self {
            key: key.to_string(),
            state: TaskState::Pending,
            created_at: chrono::Utc::now().timestamp(),
            display_name,
            file_extension,
            byte_count: UNKNOWN_BYTE_COUNT,
            received_bytes: 0,
            resume_token: None,
            file_location: None,
            detail: None,
        }
    }

    /// Classify into one of the five fixed type categories.
    pub fn file_type(&self) -> FileType {
        FileType::from_extension(&self.file_extension)
    }

    /// Store a resume token, clearing any file location (exclusivity).
    pub fn set_resume_token(&mut self, token: Vec<u8>) {
        self.file_location = None;
        self.resume_token = Some(token);
    }

    /// Store the final file location, clearing any resume token (exclusivity).
    pub fn set_file_location(&mut self, location: PathBuf) {
        self.resume_token = None;
        self.file_location = Some(location);
    }

    /// Reset to `Pending` with zero progress (transport failed without a token,
    /// or an explicit redownload).
    pub fn reset_to_pending(&mut self) {
        self.state = TaskState::Pending;
        self.received_bytes = 0;
        self.resume_token = None;
        self.file_location = None;
    }

    /// Successful completion: record the final size and relocated file.
    pub fn complete(&mut self, byte_count: i64, location: PathBuf) {
        self.state = TaskState::Finished;
        if byte_count >= 0 {
            self.byte_count = byte_count;
            self.received_bytes = byte_count as u64;
        }
        self.detail = None;
        self.set_file_location(location);
    }

    /// Rename, keeping the cached extension in sync.
    pub fn set_display_name(&mut self, name: &str) {
        self.display_name = name.to_string();
        self.file_extension = extension_of(name);
    }

    /// Fraction received in [0, 1]; 0 while the total is unknown.
    pub fn progress(&self) -> f64 {
        if self.byte_count <= 0 {
            return 0.0;
        }
        (self.received_bytes as f64 / self.byte_count as f64).clamp(0.0, 1.0)
    }
}

/// Derive a display name from the last non-empty URL path segment, falling
/// back to the host, then to the raw string.
pub fn display_name_from_url(raw: &str) -> String {
    if let Ok(parsed) = url::Url::parse(raw) {
        if let Some(segments) = parsed.path_segments() {
            if let Some(last) = segments.filter(|s| !s.is_empty()).last() {
                return last.to_string();
            }
        }
        if let Some(host) = parsed.host_str() {
            return host.to_string();
        }
    }
    raw.to_string()
}

/// Lowercased extension of a file name, "" when there is none.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains('/') => {
            ext.to_ascii_lowercase()
        }
        _ => String::new(),
    }
}
