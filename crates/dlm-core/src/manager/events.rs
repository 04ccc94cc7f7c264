//! Transport event handling: completion, failure, progress, late tokens.
//!
//! Events arrive on arbitrary transport threads. Each handler takes the
//! critical section, applies the registry/budget/index consequences, plans a
//! refill, and performs transport and filesystem work outside the lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::scheduler::AdmissionBudget;
use crate::task::{SortKey, TaskState};
use crate::transport::{status_is_success, TransportEvent};

use super::{execute_actions, persist_if_dirty, plan_refills, start_transfers, Shared};

pub(crate) fn handle_event(shared: &Arc<Shared>, key: &str, event: TransportEvent) {
    match event {
        TransportEvent::Progress {
            total_written,
            total_expected,
            ..
        } => on_progress(shared, key, total_written, total_expected),
        TransportEvent::Finished {
            status,
            byte_count,
            temp_file,
        } => on_finished(shared, key, status, byte_count, temp_file),
        TransportEvent::Failed {
            detail,
            resume_token,
            received,
        } => on_failed(shared, key, &detail, resume_token, received),
        TransportEvent::ResumeToken(token) => on_resume_token(shared, key, token),
    }
}

fn on_progress(shared: &Arc<Shared>, key: &str, total_written: u64, total_expected: i64) {
    let size_learned = {
        let mut inner = shared.inner.lock().unwrap();
        let Some(op) = inner.ops.get(key) else {
            return;
        };
        op.note_progress(total_written, total_expected);

        let Some(task) = inner.registry.get_mut(key) else {
            return;
        };
        task.received_bytes = total_written;
        inner.dirty.tasks = true;

        let old = inner.registry.get(key).map(|t| t.byte_count);
        let changed = total_expected >= 0 && old != Some(total_expected);
        if changed {
            // The total just became known (or moved): reposition under the
            // size key only, an O(log n) relocation.
            inner.relocate(key, &[SortKey::Size], |t| t.byte_count = total_expected);
        }
        changed
    };
    // Progress ticks are hot; only a size change triggers a save.
    if size_learned {
        persist_if_dirty(shared);
    }
}

fn on_finished(shared: &Arc<Shared>, key: &str, status: u16, byte_count: i64, temp_file: PathBuf) {
    if !status_is_success(status) {
        // Completed transfer with a non-success status is a failure without
        // a resume token; the failure path owns all op and slot accounting.
        on_failed(shared, key, &format!("HTTP {status}"), None, 0);
        return;
    }

    let display_name = {
        let mut inner = shared.inner.lock().unwrap();
        if let Some(op) = inner.ops.remove(key) {
            op.mark_finished();
        }
        let prior = inner.registry.state_of(key);
        release_slot(&mut inner.scheduler.budget, prior);
        match inner.registry.get(key) {
            Some(task) => task.display_name.clone(),
            // Deleted while the transfer was landing; nothing to record.
            None => {
                let (plans, actions) = plan_refills(&mut inner);
                drop(inner);
                execute_actions(actions);
                start_transfers(shared, plans);
                return;
            }
        }
    };

    let location = relocate_file(&temp_file, &shared.download_dir.join(&display_name));
    let mut inner = shared.inner.lock().unwrap();
    inner.relocate(key, &[SortKey::Size], |t| t.complete(byte_count, location));
    tracing::info!(key, status, byte_count, "download finished");
    let (plans, actions) = plan_refills(&mut inner);
    drop(inner);
    execute_actions(actions);
    start_transfers(shared, plans);
    persist_if_dirty(shared);
}

fn on_failed(shared: &Arc<Shared>, key: &str, detail: &str, token: Option<Vec<u8>>, received: u64) {
    {
        let mut inner = shared.inner.lock().unwrap();
        if let Some(op) = inner.ops.remove(key) {
            op.mark_finished();
        }
        let prior = inner.registry.state_of(key);
        release_slot(&mut inner.scheduler.budget, prior);
        if inner.registry.fail(key, detail, token, received) {
            tracing::warn!(key, detail, "download failed");
            inner.dirty.tasks = true;
        }
        let (plans, actions) = plan_refills(&mut inner);
        drop(inner);
        execute_actions(actions);
        start_transfers(shared, plans);
    }
    persist_if_dirty(shared);
}

fn on_resume_token(shared: &Arc<Shared>, key: &str, token: Option<Vec<u8>>) {
    {
        let mut inner = shared.inner.lock().unwrap();
        match (inner.registry.state_of(key), token) {
            // The stop was already decided optimistically; the token only
            // augments metadata.
            (Some(TaskState::Stopped), Some(token)) => {
                if let Some(task) = inner.registry.get_mut(key) {
                    task.set_resume_token(token);
                    inner.dirty.tasks = true;
                }
            }
            (state, _) => {
                tracing::debug!(key, ?state, "discarding resume token for incompatible state");
            }
        }
    }
    persist_if_dirty(shared);
}

/// Give back whatever slot the task's prior state held.
fn release_slot(budget: &mut AdmissionBudget, prior: Option<TaskState>) {
    match prior {
        Some(TaskState::Downloading) => budget.note_running_gone(),
        Some(TaskState::Paused) => budget.note_paused_gone(),
        _ => {}
    }
}

/// Move a finished temp file into permanent storage; on failure the temp
/// path stays authoritative so the data is never lost.
fn relocate_file(temp: &Path, dest: &Path) -> PathBuf {
    if temp == dest {
        return dest.to_path_buf();
    }
    match std::fs::rename(temp, dest) {
        Ok(()) => dest.to_path_buf(),
        Err(_) => match std::fs::copy(temp, dest) {
            Ok(_) => {
                let _ = std::fs::remove_file(temp);
                dest.to_path_buf()
            }
            Err(e) => {
                tracing::warn!(
                    "could not move {} to {}: {e}",
                    temp.display(),
                    dest.display()
                );
                temp.to_path_buf()
            }
        },
    }
}
