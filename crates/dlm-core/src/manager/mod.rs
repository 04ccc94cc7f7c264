//! The download manager: one owner per task set.
//!
//! All registry, index, waiting-queue, and budget mutations are serialized
//! through a single `Mutex<Inner>` per manager instance; transport calls
//! (start/suspend/cancel) always happen outside that critical section so a
//! transport that delivers events synchronously can never deadlock us.
//! Events from any thread funnel back through [`events`].

mod bootstrap;
mod events;
mod mutate;
mod query;

pub use query::TaskProgress;

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::activity::{spawn_tracker, ActivityObserver};
use crate::config::{DlmConfig, Settings};
use crate::index::{IndexSet, TaskComparator};
use crate::operation::TaskOperation;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::store::{self, BlobStore, DirtyFlags, DisplayBlob, TasksBlob, TrashBlob};
use crate::task::{SortKey, SortOrder, TaskKey, TaskState};
use crate::transport::{EventSink, Transport, TransportEvent};

/// Mutable manager state; everything in here is guarded by `Shared::inner`.
pub(crate) struct Inner {
    pub(crate) registry: TaskRegistry,
    pub(crate) indexes: IndexSet,
    pub(crate) scheduler: Scheduler,
    pub(crate) ops: HashMap<TaskKey, Arc<TaskOperation>>,
    pub(crate) settings: Settings,
    pub(crate) dirty: DirtyFlags,
}

impl Inner {
    fn new(settings: Settings) -> Self {
        let max_concurrent = settings.max_concurrent;
        Self {
            registry: TaskRegistry::new(),
            indexes: IndexSet::new(),
            scheduler: Scheduler::new(max_concurrent),
            ops: HashMap::new(),
            settings,
            dirty: DirtyFlags::default(),
        }
    }

    /// Flushed ascending sequence for one sort key.
    pub(crate) fn ascending(&mut self, key: SortKey) -> Vec<TaskKey> {
        let Inner {
            registry, indexes, ..
        } = self;
        let cmp = TaskComparator::new(registry.tasks(), key);
        indexes
            .get_mut(key)
            .sequence(|| registry.keys(), |a, b| cmp.compare(a, b))
            .to_vec()
    }

    /// Current display ordering (settings sort key + order).
    pub(crate) fn display_order(&mut self) -> Vec<TaskKey> {
        let ascending = self.ascending(self.settings.sort_key);
        match self.settings.sort_order {
            SortOrder::Ascending => ascending,
            SortOrder::Descending => ascending.into_iter().rev().collect(),
        }
    }

    /// Drop a key from every index. Must run while the task's metadata is
    /// still in the registry (comparators read it).
    pub(crate) fn forget_everywhere(&mut self, key: &str) {
        let Inner {
            registry, indexes, ..
        } = self;
        for sort_key in SortKey::ALL {
            let cmp = TaskComparator::new(registry.tasks(), sort_key);
            indexes.get_mut(sort_key).forget(key, |a, b| cmp.compare(a, b));
        }
    }

    /// Remove-then-reinsert under one key after a metadata change. `mutate`
    /// runs between the removal (old metadata) and the re-insertion note.
    pub(crate) fn relocate(
        &mut self,
        key: &str,
        sort_keys: &[SortKey],
        mutate: impl FnOnce(&mut crate::task::Task),
    ) {
        {
            let Inner {
                registry, indexes, ..
            } = self;
            for &sort_key in sort_keys {
                let cmp = TaskComparator::new(registry.tasks(), sort_key);
                indexes.get_mut(sort_key).forget(key, |a, b| cmp.compare(a, b));
            }
        }
        if let Some(task) = self.registry.get_mut(key) {
            mutate(task);
        }
        for &sort_key in sort_keys {
            self.indexes.get_mut(sort_key).note_added(key);
        }
        self.dirty.tasks = true;
        self.dirty.display = true;
    }

    pub(crate) fn mark_list_dirty(&mut self) {
        self.dirty.tasks = true;
        self.dirty.display = true;
    }
}

/// State shared with event sinks and the activity tracker thread.
pub(crate) struct Shared {
    pub(crate) store: Arc<dyn BlobStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) download_dir: PathBuf,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) ready: Mutex<bool>,
    pub(crate) ready_cv: Condvar,
    pub(crate) observers: Mutex<Vec<ActivityObserver>>,
}

/// Deferred transport-handle call, executed after the critical section.
pub(crate) enum HandleCall {
    Suspend,
    Resume,
    Stop,
    Delete,
}

pub(crate) type HandleAction = (Arc<TaskOperation>, HandleCall);

/// A decided admission: slot already reserved, transport not yet started.
pub(crate) struct StartPlan {
    key: TaskKey,
    token: Option<Vec<u8>>,
    op: Arc<TaskOperation>,
}

/// Owner of the scheduling state for one task set. Not `Clone`: construction
/// and teardown are explicit, and dropping the manager stops its threads.
pub struct DownloadManager {
    shared: Arc<Shared>,
    shutdown: Arc<AtomicBool>,
    tracker: Option<JoinHandle<()>>,
    loader: Option<JoinHandle<()>>,
}

impl DownloadManager {
    /// Construct a manager and start its asynchronous bootstrap from the
    /// store. Callers may use the manager immediately; mutators and queries
    /// block on the readiness barrier until the load completes.
    pub fn open(
        store: Arc<dyn BlobStore>,
        transport: Arc<dyn Transport>,
        config: &DlmConfig,
    ) -> Self {
        let settings = Settings::from_config(config);
        let download_dir = config
            .download_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let shared = Arc::new(Shared {
            store,
            transport,
            download_dir,
            inner: Mutex::new(Inner::new(settings)),
            ready: Mutex::new(false),
            ready_cv: Condvar::new(),
            observers: Mutex::new(Vec::new()),
        });

        let loader = {
            let shared = Arc::clone(&shared);
            let config = config.clone();
            std::thread::spawn(move || bootstrap::run(&shared, &config))
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let tracker = spawn_tracker(Arc::downgrade(&shared), Arc::clone(&shutdown));

        Self {
            shared,
            shutdown,
            tracker: Some(tracker),
            loader: Some(loader),
        }
    }

    /// Block until the initial load from the store has completed.
    pub fn wait_ready(&self) {
        let mut ready = self.shared.ready.lock().unwrap();
        while !*ready {
            ready = self.shared.ready_cv.wait(ready).unwrap();
        }
    }

    /// Register an observer for the once-per-second activity snapshot.
    pub fn observe_activity(&self, observer: ActivityObserver) {
        self.shared.observers.lock().unwrap().push(observer);
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Run queued admissions and deferred handle calls, then persist.
    pub(crate) fn finish_mutation(&self, plans: Vec<StartPlan>, actions: Vec<HandleAction>) {
        execute_actions(actions);
        start_transfers(&self.shared, plans);
        persist_if_dirty(&self.shared);
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.loader.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.tracker.take() {
            let _ = handle.join();
        }
        persist_if_dirty(&self.shared);
    }
}

/// Build the per-task event sink. Holds only a weak reference so a dropped
/// manager silently discards late transport events.
pub(crate) fn make_sink(shared: &Arc<Shared>, key: &str) -> EventSink {
    let weak = Arc::downgrade(shared);
    let key = key.to_string();
    Arc::new(move |event: TransportEvent| {
        if let Some(shared) = weak.upgrade() {
            events::handle_event(&shared, &key, event);
        }
    })
}

/// Execute deferred handle calls outside the critical section.
pub(crate) fn execute_actions(actions: Vec<HandleAction>) {
    for (op, call) in actions {
        match call {
            HandleCall::Suspend => {
                op.suspend();
            }
            HandleCall::Resume => {
                op.resume_transfer();
            }
            HandleCall::Stop => op.stop(),
            HandleCall::Delete => op.delete(),
        }
    }
}

/// Start planned transfers. A failed handshake rolls the task back to
/// `Pending` and immediately tries the next waiting candidate, so a bad URL
/// cannot strand a slot.
pub(crate) fn start_transfers(shared: &Arc<Shared>, plans: Vec<StartPlan>) {
    let mut queue: VecDeque<StartPlan> = plans.into();
    while let Some(plan) = queue.pop_front() {
        let sink = make_sink(shared, &plan.key);
        let result = match &plan.token {
            Some(token) => shared.transport.start_resumed(&plan.key, token, sink),
            None => shared.transport.start(&plan.key, sink),
        };
        match result {
            Ok(handle) => plan.op.start(handle),
            Err(e) => {
                tracing::warn!(key = %plan.key, "transport start failed: {e:#}");
                let mut inner = shared.inner.lock().unwrap();
                inner.scheduler.budget.note_running_gone();
                inner.ops.remove(&plan.key);
                // A token we took for the handshake goes back into the task
                // so the failure policy lands on `Stopped`, not `Pending`.
                let received = inner
                    .registry
                    .get(&plan.key)
                    .map(|t| t.received_bytes)
                    .unwrap_or(0);
                inner.registry.fail(
                    &plan.key,
                    &format!("start failed: {e:#}"),
                    plan.token.clone(),
                    received,
                );
                inner.dirty.tasks = true;
                let (plans, actions) = plan_refills(&mut inner);
                drop(inner);
                execute_actions(actions);
                queue.extend(plans);
            }
        }
    }
}

/// Reserve a slot and build the start plan for a pending/stopped task. The
/// caller has already checked the budget. Critical section held.
pub(crate) fn admit_now(inner: &mut Inner, key: &str) -> Option<StartPlan> {
    let task = inner.registry.get_mut(key)?;
    let token = task.resume_token.take();
    task.state = TaskState::Downloading;
    let op = Arc::new(TaskOperation::new(key));
    inner.ops.insert(key.to_string(), Arc::clone(&op));
    inner.scheduler.budget.note_started();
    inner.dirty.tasks = true;
    Some(StartPlan {
        key: key.to_string(),
        token,
        op,
    })
}

/// Pop waiting candidates while the budget has slots. Paused members resume
/// in place; pending/stopped members get a fresh operation and a start plan.
/// Must be called with the critical section held.
pub(crate) fn plan_refills(inner: &mut Inner) -> (Vec<StartPlan>, Vec<HandleAction>) {
    let mut plans = Vec::new();
    let mut actions = Vec::new();
    while let Some(key) = inner.scheduler.next_admissible() {
        match inner.registry.state_of(&key) {
            Some(TaskState::Pending) | Some(TaskState::Stopped) => {
                if let Some(plan) = admit_now(inner, &key) {
                    plans.push(plan);
                }
            }
            Some(TaskState::Paused) => {
                if let Some(op) = inner.ops.get(&key).map(Arc::clone) {
                    inner.scheduler.budget.note_resumed();
                    if let Some(task) = inner.registry.get_mut(&key) {
                        task.state = TaskState::Downloading;
                    }
                    inner.dirty.tasks = true;
                    actions.push((op, HandleCall::Resume));
                } else if inner.registry.self_heal(&key, false).is_some() {
                    // Healed to stopped/pending; requeue so the next loop
                    // iteration admits it normally.
                    inner.scheduler.waiting.push(&key);
                }
            }
            // Unknown, already downloading, or finished: drop from the queue.
            _ => {}
        }
    }
    (plans, actions)
}

/// Save every dirty blob. Flags are cleared at snapshot time and re-set on a
/// failed save so the next trigger retries; in-memory state stays
/// authoritative either way.
pub(crate) fn persist_if_dirty(shared: &Shared) {
    let (flags, tasks_blob, display_blob, trash_blob, settings) = {
        let mut inner = shared.inner.lock().unwrap();
        if !inner.dirty.any() {
            return;
        }
        let flags = inner.dirty;
        inner.dirty = DirtyFlags::default();

        let tasks_blob = flags.tasks.then(|| TasksBlob {
            tasks: inner.registry.tasks().values().cloned().collect(),
        });
        let display_blob = flags.display.then(|| {
            let sort_key = inner.settings.sort_key;
            DisplayBlob {
                sort_key,
                sort_order: inner.settings.sort_order,
                keys: inner.ascending(sort_key),
            }
        });
        let trash_blob = flags.trash.then(|| TrashBlob {
            keys: inner.registry.trash().to_vec(),
        });
        let settings = flags.settings.then(|| inner.settings.clone());
        (flags, tasks_blob, display_blob, trash_blob, settings)
    };

    let mut failed = DirtyFlags::default();
    failed.tasks = flags.tasks && !save_blob(shared, store::TASKS_BLOB, tasks_blob.as_ref());
    failed.display = flags.display && !save_blob(shared, store::DISPLAY_BLOB, display_blob.as_ref());
    failed.trash = flags.trash && !save_blob(shared, store::TRASH_BLOB, trash_blob.as_ref());
    failed.settings = flags.settings && !save_blob(shared, store::SETTINGS_BLOB, settings.as_ref());

    if failed.any() {
        let mut inner = shared.inner.lock().unwrap();
        inner.dirty.tasks |= failed.tasks;
        inner.dirty.display |= failed.display;
        inner.dirty.trash |= failed.trash;
        inner.dirty.settings |= failed.settings;
    }
}

fn save_blob<T: serde::Serialize>(shared: &Shared, name: &str, value: Option<&T>) -> bool {
    let Some(value) = value else {
        return true;
    };
    let result = store::encode(value).and_then(|bytes| shared.store.save(name, &bytes));
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(blob = name, "blob save failed, keeping dirty: {e}");
            false
        }
    }
}
