//! `dlm status` – per-state counts and totals.

use anyhow::Result;
use dlm_core::config::DlmConfig;
use dlm_core::store::{self, FsBlobStore};
use dlm_core::task::TaskState;

use super::settings_or_default;

const STATES: [TaskState; 5] = [
    TaskState::Pending,
    TaskState::Downloading,
    TaskState::Paused,
    TaskState::Stopped,
    TaskState::Finished,
];

pub fn run_status(store: &FsBlobStore, cfg: &DlmConfig) -> Result<()> {
    let settings = settings_or_default(store, cfg)?;
    let blob = store::load_tasks(store)?;
    let trash = store::load_trash(store)?;

    println!("{} task(s), {} in trash", blob.tasks.len(), trash.keys.len());
    for state in STATES {
        let count = blob.tasks.iter().filter(|t| t.state == state).count();
        if count > 0 {
            println!("  {:<12} {count}", format!("{state:?}").to_lowercase());
        }
    }
    match settings.max_concurrent {
        0 => println!("limit: unbounded"),
        n => println!("limit: {n}"),
    }
    Ok(())
}
