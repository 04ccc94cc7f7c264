//! `dlm list` – show tasks in display order, optionally under sections.

use anyhow::Result;
use dlm_core::config::DlmConfig;
use dlm_core::index::sections_for;
use dlm_core::store::{self, FsBlobStore};
use dlm_core::task::{SortKey, SortOrder, Task, TaskKey};
use std::collections::HashMap;

use super::{ascending_keys, settings_or_default, size_column, task_map};

pub fn run_list(
    store: &FsBlobStore,
    cfg: &DlmConfig,
    sort: Option<SortKey>,
    desc: bool,
    sections: bool,
) -> Result<()> {
    let settings = settings_or_default(store, cfg)?;
    let tasks = task_map(store::load_tasks(store)?.tasks);
    if tasks.is_empty() {
        println!("No tasks in the list.");
        return Ok(());
    }

    let sort_key = sort.unwrap_or(settings.sort_key);
    let order = if desc {
        SortOrder::Descending
    } else {
        settings.sort_order
    };
    let ascending = ascending_keys(&tasks, sort_key);

    if sections {
        let (display, ranges) = sections_for(&ascending, sort_key, order, &tasks, chrono::Local::now());
        for section in ranges {
            println!("-- {}", section.label);
            for key in &display[section.range] {
                print_row(key, &tasks);
            }
        }
    } else {
        let display: Vec<TaskKey> = match order {
            SortOrder::Ascending => ascending,
            SortOrder::Descending => ascending.into_iter().rev().collect(),
        };
        println!("{:<12} {:>12} {}", "STATE", "SIZE", "NAME");
        for key in &display {
            print_row(key, &tasks);
        }
    }
    Ok(())
}

fn print_row(key: &str, tasks: &HashMap<TaskKey, Task>) {
    let Some(task) = tasks.get(key) else {
        return;
    };
    println!(
        "{:<12} {:>12} {}",
        format!("{:?}", task.state).to_lowercase(),
        size_column(task.byte_count),
        task.display_name
    );
}
