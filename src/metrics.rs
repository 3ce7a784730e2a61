// Activity metrics
//
// Counters for saves, snapshots and auto-save activity, logged on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-wide counters.
///
/// Uses atomic operations so the auto-save tasks can record without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Successful configuration saves
    pub saves: AtomicU64,

    /// Failed configuration saves
    pub save_failures: AtomicU64,

    pub snapshots_created: AtomicU64,

    /// Snapshots removed by the retention limit
    pub snapshots_evicted: AtomicU64,

    pub restores: AtomicU64,

    /// Edits folded into an already pending auto-save
    pub autosave_coalesced: AtomicU64,

    pub documents_generated: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            saves: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            snapshots_created: AtomicU64::new(0),
            snapshots_evicted: AtomicU64::new(0),
            restores: AtomicU64::new(0),
            autosave_coalesced: AtomicU64::new(0),
            documents_generated: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_save(&self) {
        self.saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_created(&self) {
        self.snapshots_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshots_evicted(&self, count: usize) {
        self.snapshots_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_restore(&self) {
        self.restores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_autosave_coalesced(&self) {
        self.autosave_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_document_generated(&self) {
        self.documents_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of save attempts that failed, 0.0 when nothing was saved.
    pub fn save_failure_rate(&self) -> f64 {
        let failed = self.save_failures.load(Ordering::Relaxed);
        let total = self.saves.load(Ordering::Relaxed) + failed;
        if total > 0 {
            failed as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Activity Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Saves: {} ok, {} failed ({:.1}% failure rate)",
            self.saves.load(Ordering::Relaxed),
            self.save_failures.load(Ordering::Relaxed),
            self.save_failure_rate() * 100.0
        );
        tracing::info!(
            "Snapshots: {} created, {} evicted, {} restores",
            self.snapshots_created.load(Ordering::Relaxed),
            self.snapshots_evicted.load(Ordering::Relaxed),
            self.restores.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Auto-save edits coalesced: {}, documents generated: {}",
            self.autosave_coalesced.load(Ordering::Relaxed),
            self.documents_generated.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
