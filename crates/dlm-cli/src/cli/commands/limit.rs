//! `dlm limit [n]` – show or change the concurrency limit.

use anyhow::Result;
use dlm_core::config::DlmConfig;
use dlm_core::store::{self, BlobStore, FsBlobStore};

use super::settings_or_default;

pub fn run_limit(store: &FsBlobStore, cfg: &DlmConfig, n: Option<usize>) -> Result<()> {
    let mut settings = settings_or_default(store, cfg)?;
    match n {
        None => match settings.max_concurrent {
            0 => println!("unbounded"),
            n => println!("{n}"),
        },
        Some(n) => {
            settings.max_concurrent = n;
            store.save(store::SETTINGS_BLOB, &store::encode(&settings)?)?;
            match n {
                0 => println!("limit set to unbounded"),
                n => println!("limit set to {n}"),
            }
        }
    }
    Ok(())
}
