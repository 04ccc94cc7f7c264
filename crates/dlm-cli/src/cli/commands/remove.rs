//! `dlm remove <url>` – drop a task from the list.

use anyhow::{bail, Result};
use dlm_core::config::DlmConfig;
use dlm_core::store::{self, BlobStore, FsBlobStore};

use super::settings_or_default;

pub fn run_remove(store: &FsBlobStore, cfg: &DlmConfig, url: &str) -> Result<()> {
    let settings = settings_or_default(store, cfg)?;
    let mut blob = store::load_tasks(store)?;
    let Some(pos) = blob.tasks.iter().position(|t| t.key == url) else {
        bail!("no task for URL: {url}");
    };
    blob.tasks.remove(pos);
    store.save(store::TASKS_BLOB, &store::encode(&blob)?)?;

    if settings.trash_enabled {
        let mut trash = store::load_trash(store)?;
        if !trash.keys.iter().any(|k| k == url) {
            trash.keys.push(url.to_string());
            store.save(store::TRASH_BLOB, &store::encode(&trash)?)?;
        }
        println!("Removed to trash: {url}");
    } else {
        println!("Removed: {url}");
    }
    Ok(())
}
