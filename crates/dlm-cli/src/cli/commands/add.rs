//! `dlm add <url>...` – queue URLs as pending tasks.

use anyhow::Result;
use dlm_core::store::{self, BlobStore, FsBlobStore};
use dlm_core::task::Task;

pub fn run_add(store: &FsBlobStore, urls: &[String]) -> Result<()> {
    let mut blob = store::load_tasks(store)?;
    let mut added = 0usize;
    for url in urls {
        if !is_admissible(url) {
            eprintln!("skipping (not an http/https url): {url}");
            continue;
        }
        if blob.tasks.iter().any(|t| t.key == *url) {
            eprintln!("skipping (already listed): {url}");
            continue;
        }
        let task = Task::new(url);
        println!("Added task: {} ({})", task.display_name, url);
        blob.tasks.push(task);
        added += 1;
    }
    if added > 0 {
        store.save(store::TASKS_BLOB, &store::encode(&blob)?)?;
    }
    println!("{added} task(s) added.");
    Ok(())
}

fn is_admissible(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
