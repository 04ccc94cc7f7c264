//! `dlm rename <url> <name>` – change a task's display name.

use anyhow::{bail, Result};
use dlm_core::store::{self, BlobStore, FsBlobStore};

pub fn run_rename(store: &FsBlobStore, url: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("new name must not be empty");
    }
    let mut blob = store::load_tasks(store)?;
    let Some(task) = blob.tasks.iter_mut().find(|t| t.key == url) else {
        bail!("no task for URL: {url}");
    };
    let old = task.display_name.clone();
    task.set_display_name(name);
    store.save(store::TASKS_BLOB, &store::encode(&blob)?)?;
    println!("Renamed {old} -> {name}");
    Ok(())
}
