//! `dlm trash` – inspect or purge the trash list.

use anyhow::{bail, Result};
use dlm_core::store::{self, BlobStore, FsBlobStore};

pub fn run_trash(store: &FsBlobStore, purge: Option<&str>) -> Result<()> {
    let mut trash = store::load_trash(store)?;

    if let Some(url) = purge {
        let Some(pos) = trash.keys.iter().position(|k| k == url) else {
            bail!("not in trash: {url}");
        };
        trash.keys.remove(pos);
        store.save(store::TRASH_BLOB, &store::encode(&trash)?)?;
        println!("Purged: {url}");
        return Ok(());
    }

    if trash.keys.is_empty() {
        println!("Trash is empty.");
    } else {
        for key in &trash.keys {
            println!("{key}");
        }
    }
    Ok(())
}
