//! Configuration: on-disk defaults plus the runtime-mutable settings record.
//!
//! `DlmConfig` is the operator-edited file (`~/.config/dlm/config.toml`,
//! created with defaults on first run). `Settings` is the small record the
//! manager mutates at runtime (sort key/order, concurrency limit, feature
//! flags) and persists as its own blob.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::task::{SortKey, SortOrder};

/// What a pause request does to a downloading task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PausePolicy {
    /// Suspend the transport in place; resumable without a new handshake.
    #[default]
    Suspend,
    /// Tear the transport down, keeping a resume token.
    Stop,
}

/// Global configuration loaded from `~/.config/dlm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlmConfig {
    /// Maximum concurrently downloading tasks; 0 = unbounded.
    pub max_concurrent: usize,
    /// Pause behavior; see [`PausePolicy`].
    #[serde(default)]
    pub pause_policy: PausePolicy,
    /// Keep deleted tasks on a trash list instead of purging them.
    #[serde(default)]
    pub trash_enabled: bool,
    /// Directory finished files are moved into (default: current dir).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Override for the blob-store state directory (default: XDG state home).
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl Default for DlmConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            pause_policy: PausePolicy::Suspend,
            trash_enabled: true,
            download_dir: None,
            state_dir: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DlmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Runtime-mutable settings, persisted as the `settings` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    /// 0 = unbounded.
    pub max_concurrent: usize,
    pub pause_policy: PausePolicy,
    pub trash_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&DlmConfig::default())
    }
}

impl Settings {
    pub fn from_config(cfg: &DlmConfig) -> Self {
        Self {
            sort_key: SortKey::AddTime,
            sort_order: SortOrder::Ascending,
            max_concurrent: cfg.max_concurrent,
            pause_policy: cfg.pause_policy,
            trash_enabled: cfg.trash_enabled,
        }
    }
}
