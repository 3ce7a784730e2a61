//! Debounced auto-save of section edits.
//!
//! Each section has at most one pending edit. A new edit for the same
//! section folds its patch into the pending one (later fields win) and
//! restarts that section's timer, so a burst of keystrokes produces a single
//! write once the section has been quiet for the configured delay.
//!
//! When the timer fires the merged patch is applied to the live
//! [`ConfigState`] and the configuration is saved on tokio's blocking pool.
//! A failed save keeps the patch and reports [`AutoSaveStatus::Failed`];
//! [`AutoSaveCoordinator::retry`] schedules it again.
//!
//! Closing (or dropping) the coordinator discards edits whose timer has not
//! fired yet. They were never applied, so they are lost.

use crate::error::{ControlError, PersistenceError};
use crate::metrics::Metrics;
use crate::models::SectionPatch;
use crate::persistence::ConfigRepository;
use crate::state::ConfigState;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable state of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveStatus {
    Idle,
    /// At least one edit is waiting for its timer
    Pending,
    Saved {
        at: DateTime<Utc>,
    },
    Failed {
        section_id: String,
        message: String,
    },
}

/// A cancellable delayed action backed by a tokio task.
///
/// Must be reset from within a tokio runtime.
#[derive(Debug)]
pub struct ScheduledSave {
    delay: Duration,
    task: Option<JoinHandle<()>>,
}

impl ScheduledSave {
    pub fn new(delay: Duration) -> Self {
        Self { delay, task: None }
    }

    /// Cancel any pending run and schedule `action` after the delay.
    pub fn reset<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Forget the task without aborting it.
    fn release(&mut self) {
        self.task = None;
    }
}

impl Drop for ScheduledSave {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PendingEdit {
    patch: SectionPatch,
    timer: ScheduledSave,
    /// Identifies the timer allowed to apply this edit
    generation: u64,
    failed: bool,
}

struct Inner {
    state: ConfigState,
    repository: ConfigRepository,
    delay: Duration,
    pending: Mutex<IndexMap<String, PendingEdit>>,
    status_tx: watch::Sender<AutoSaveStatus>,
    generation: AtomicU64,
    closed: AtomicBool,
    metrics: Option<Arc<Metrics>>,
}

pub struct AutoSaveCoordinator {
    inner: Arc<Inner>,
}

impl AutoSaveCoordinator {
    pub fn new(state: ConfigState, repository: ConfigRepository, delay: Duration) -> Self {
        Self::build(state, repository, delay, None)
    }

    pub fn with_metrics(
        state: ConfigState,
        repository: ConfigRepository,
        delay: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::build(state, repository, delay, Some(metrics))
    }

    fn build(
        state: ConfigState,
        repository: ConfigRepository,
        delay: Duration,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let (status_tx, _) = watch::channel(AutoSaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                state,
                repository,
                delay,
                pending: Mutex::new(IndexMap::new()),
                status_tx,
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                metrics,
            }),
        }
    }

    /// Record an edit to `section_id` and (re)start its timer.
    ///
    /// Must be called from within a tokio runtime. Ignored after
    /// [`close`](Self::close).
    pub fn edit(&self, section_id: &str, patch: SectionPatch) {
        if self.inner.closed.load(Ordering::SeqCst) {
            tracing::warn!("Ignoring edit to {} after auto-save was closed", section_id);
            return;
        }

        let mut pending = self.inner.lock_pending();
        let generation = self.inner.next_generation();

        let edit = match pending.entry(section_id.to_string()) {
            Entry::Occupied(entry) => {
                let edit = entry.into_mut();
                edit.patch.merge(patch);
                if let Some(metrics) = &self.inner.metrics {
                    metrics.record_autosave_coalesced();
                }
                edit
            }
            Entry::Vacant(entry) => entry.insert(PendingEdit {
                patch,
                timer: ScheduledSave::new(self.inner.delay),
                generation,
                failed: false,
            }),
        };
        edit.generation = generation;
        edit.failed = false;
        edit.timer.reset(fire(Arc::downgrade(&self.inner), section_id.to_string(), generation));

        tracing::debug!("Auto-save timer reset for {}", section_id);
        self.inner.publish(AutoSaveStatus::Pending);
    }

    /// Schedule a failed edit again. Returns false when there is no failed
    /// edit for `section_id`.
    pub fn retry(&self, section_id: &str) -> bool {
        let mut pending = self.inner.lock_pending();
        let generation = self.inner.next_generation();

        let Some(edit) = pending.get_mut(section_id).filter(|edit| edit.failed) else {
            return false;
        };
        edit.generation = generation;
        edit.failed = false;
        edit.timer.reset(fire(Arc::downgrade(&self.inner), section_id.to_string(), generation));

        tracing::info!("Retrying auto-save for {}", section_id);
        self.inner.publish(AutoSaveStatus::Pending);
        true
    }

    /// Drop the pending edit of `section_id` without applying it.
    pub fn cancel(&self, section_id: &str) -> bool {
        let mut pending = self.inner.lock_pending();
        let removed = pending.shift_remove(section_id).is_some();
        if removed && pending.is_empty() {
            self.inner.publish(AutoSaveStatus::Idle);
        }
        removed
    }

    /// Apply every pending edit now and save once.
    ///
    /// Returns the number of edits applied. On a save failure all of them
    /// are kept for [`retry`](Self::retry).
    pub fn flush(&self) -> Result<usize, ControlError> {
        let mut pending = self.inner.lock_pending();
        if pending.is_empty() {
            return Ok(0);
        }

        let mut applied = Vec::new();
        for (section_id, mut edit) in pending.drain(..) {
            edit.timer.cancel();
            match self.inner.state.update_section(&section_id, edit.patch.clone()) {
                Ok(_) => applied.push((section_id, edit)),
                Err(e) => tracing::warn!("Dropping auto-save edit: {}", e),
            }
        }

        if let Err(e) = self.inner.save() {
            let message = e.user_message();
            let first = applied.first().map(|(id, _)| id.clone()).unwrap_or_default();
            for (section_id, mut edit) in applied {
                edit.failed = true;
                pending.insert(section_id, edit);
            }
            self.inner.publish(AutoSaveStatus::Failed {
                section_id: first,
                message,
            });
            return Err(e.into());
        }

        let count = applied.len();
        self.inner.publish_saved();
        Ok(count)
    }

    /// Stop accepting edits and discard the pending ones.
    ///
    /// Returns how many edits were dropped.
    pub fn close(&self) -> usize {
        self.inner.closed.store(true, Ordering::SeqCst);
        let mut pending = self.inner.lock_pending();
        let dropped = pending.len();
        pending.clear();
        if dropped > 0 {
            tracing::warn!("Auto-save closed with {} unsaved edit(s) discarded", dropped);
        }
        self.inner.publish(AutoSaveStatus::Idle);
        dropped
    }

    pub fn status(&self) -> AutoSaveStatus {
        self.inner.status_tx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AutoSaveStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Sections with an edit that has not been saved yet, in first-edit order.
    pub fn pending_sections(&self) -> Vec<String> {
        self.inner.lock_pending().keys().cloned().collect()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

impl Drop for AutoSaveCoordinator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Timer body. The save itself runs on the blocking pool because the store
/// syncs to disk while the pending and state locks are held.
fn fire(inner: Weak<Inner>, section_id: String, generation: u64) -> impl Future<Output = ()> + Send {
    async move {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let result =
            tokio::task::spawn_blocking(move || inner.apply_pending(&section_id, generation)).await;
        if let Err(e) = result {
            tracing::error!("Auto-save task failed: {}", e);
        }
    }
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, IndexMap<String, PendingEdit>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_pending(&self, section_id: &str, generation: u64) {
        let mut pending = self.lock_pending();

        let Some(edit) = pending
            .get_mut(section_id)
            .filter(|edit| edit.generation == generation && !edit.failed)
        else {
            return;
        };
        edit.timer.release();
        let patch = edit.patch.clone();

        if let Err(e) = self.state.update_section(section_id, patch) {
            tracing::warn!("Dropping auto-save edit: {}", e);
            pending.shift_remove(section_id);
            self.publish(AutoSaveStatus::Failed {
                section_id: section_id.to_string(),
                message: e.to_string(),
            });
            return;
        }

        match self.save() {
            Ok(()) => {
                pending.shift_remove(section_id);
                self.publish_saved();
            }
            Err(e) => {
                tracing::error!("Auto-save of {} failed: {}", section_id, e);
                edit.failed = true;
                self.publish(AutoSaveStatus::Failed {
                    section_id: section_id.to_string(),
                    message: e.user_message(),
                });
            }
        }
    }

    fn save(&self) -> Result<(), PersistenceError> {
        let result = self.state.persist(&self.repository);
        if let Some(metrics) = &self.metrics {
            match result {
                Ok(()) => metrics.record_save(),
                Err(_) => metrics.record_save_failure(),
            }
        }
        result
    }

    fn publish_saved(&self) {
        let at = self.state.read(|config| config.last_modified);
        tracing::info!("Auto-saved configuration at {}", at);
        self.publish(AutoSaveStatus::Saved { at });
    }

    fn publish(&self, status: AutoSaveStatus) {
        self.status_tx.send_replace(status);
    }
}
