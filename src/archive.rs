//! Snapshot archive: point-in-time copies of the configuration with bounded
//! retention, restore, and per-snapshot JSON export.
//!
//! Snapshots live in the backing store under `snapshots/<id>`. After every
//! insertion the archive is trimmed to the retention limit by evicting the
//! oldest entries (creation time, then insertion sequence).

use crate::clock::Clock;
use crate::error::{ControlError, PersistenceError, Result};
use crate::metrics::Metrics;
use crate::models::{
    ArchiveStats, Configuration, DEFAULT_CONFIG_VERSION, DEFAULT_SNAPSHOT_NOTE, MAX_SNAPSHOTS,
    PRE_RESTORE_NOTE, Snapshot,
};
use crate::persistence::BackingStore;
use crate::state::ConfigState;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

/// Key prefix of archived snapshots.
pub const SNAPSHOT_PREFIX: &str = "snapshots/";

/// Ids the archive can store. Anything else cannot name a snapshot.
static SNAPSHOT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid snapshot id regex")
});

/// Result of a successful [`ArchiveManager::restore`].
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// Snapshot of the configuration as it was just before the restore.
    pub backup: Snapshot,
    /// The snapshot that was restored.
    pub restored: Snapshot,
}

#[derive(Clone)]
pub struct ArchiveManager {
    store: Arc<dyn BackingStore>,
    clock: Arc<dyn Clock>,
    retention: usize,
    metrics: Option<Arc<Metrics>>,
}

impl ArchiveManager {
    pub fn new(store: Arc<dyn BackingStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            retention: MAX_SNAPSHOTS,
            metrics: None,
        }
    }

    /// Keep at most `retention` snapshots (at least one).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Archive a deep copy of `config`, then evict beyond the retention limit.
    pub fn create_snapshot(&self, config: &Configuration, note: Option<&str>) -> Result<Snapshot> {
        let mut existing = self.load_all()?;
        let sequence = existing.iter().map(Snapshot::sequence).max().unwrap_or(0) + 1;

        let snapshot = Snapshot::capture(
            Uuid::new_v4().to_string(),
            config,
            self.clock.now(),
            note.unwrap_or(DEFAULT_SNAPSHOT_NOTE).to_string(),
            sequence,
        );
        self.write(&snapshot)?;
        tracing::info!(
            "Created snapshot {} of v{} ({})",
            snapshot.id(),
            snapshot.version(),
            snapshot.note()
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_snapshot_created();
        }

        existing.push(snapshot.clone());
        self.evict(existing)?;
        Ok(snapshot)
    }

    /// All snapshots, most recent first.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut snapshots = self.load_all()?;
        snapshots.sort_by_key(|s| std::cmp::Reverse(s.age_key()));
        Ok(snapshots)
    }

    pub fn get_snapshot(&self, id: &str) -> Result<Snapshot> {
        self.read(id)?
            .ok_or_else(|| ControlError::snapshot_not_found(id))
    }

    /// Replace the live configuration with the content of snapshot `id`.
    ///
    /// The target is looked up first; a missing id fails without touching
    /// the archive. Otherwise the current configuration is archived as a
    /// pre-restore backup before it is replaced. The backup may evict the
    /// target itself when the archive is full; the restore still completes
    /// from the copy already read.
    pub fn restore(&self, id: &str, live: &ConfigState) -> Result<RestoreOutcome> {
        let restored = self.get_snapshot(id)?;

        let backup = self.create_snapshot(&live.snapshot(), Some(PRE_RESTORE_NOTE))?;
        live.replace(restored.data().clone());

        tracing::info!(
            "Restored snapshot {} (v{}), backup {}",
            restored.id(),
            restored.version(),
            backup.id()
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_restore();
        }
        Ok(RestoreOutcome { backup, restored })
    }

    pub fn delete_snapshot(&self, id: &str) -> Result<()> {
        let key = snapshot_key(id).ok_or_else(|| ControlError::snapshot_not_found(id))?;
        if !self.store.delete(&key)? {
            return Err(ControlError::snapshot_not_found(id));
        }
        tracing::info!("Deleted snapshot {}", id);
        Ok(())
    }

    pub fn stats(&self) -> Result<ArchiveStats> {
        let snapshots = self.list_snapshots()?;
        let newest = snapshots.first();
        Ok(ArchiveStats {
            total_snapshots: snapshots.len(),
            current_version: newest
                .map_or(DEFAULT_CONFIG_VERSION, Snapshot::version)
                .to_string(),
            last_backup_time: newest.map(Snapshot::created_at),
            total_size_estimate: snapshots.iter().map(Snapshot::data_size).sum(),
        })
    }

    /// Download form of a snapshot: `claude-config-YYYY-MM-DD.json` and the
    /// pretty-printed configuration it holds, importable as a backup.
    pub fn export_snapshot(&self, id: &str) -> Result<(String, String)> {
        let snapshot = self.get_snapshot(id)?;
        let filename = format!(
            "claude-config-{}.json",
            snapshot.created_at().format("%Y-%m-%d")
        );
        let json = serde_json::to_string_pretty(snapshot.data()).map_err(|e| {
            PersistenceError::Serialization {
                what: "snapshot",
                source: e,
            }
        })?;
        Ok((filename, json))
    }

    fn evict(&self, mut snapshots: Vec<Snapshot>) -> Result<()> {
        if snapshots.len() <= self.retention {
            return Ok(());
        }

        snapshots.sort_by_key(Snapshot::age_key);
        let excess = snapshots.len() - self.retention;
        for oldest in &snapshots[..excess] {
            if let Some(key) = snapshot_key(oldest.id()) {
                self.store.delete(&key)?;
            }
            tracing::debug!("Evicted snapshot {} ({})", oldest.id(), oldest.created_at());
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_snapshots_evicted(excess);
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Snapshot>> {
        let keys = self.store.keys(SNAPSHOT_PREFIX)?;
        let mut snapshots = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(&key)? {
                snapshots.push(decode(&key, &bytes)?);
            }
        }
        Ok(snapshots)
    }

    fn read(&self, id: &str) -> Result<Option<Snapshot>> {
        let Some(key) = snapshot_key(id) else {
            return Ok(None);
        };
        match self.store.get(&key)? {
            Some(bytes) => Ok(Some(decode(&key, &bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec(snapshot).map_err(|e| PersistenceError::Serialization {
            what: "snapshot",
            source: e,
        })?;
        let key = snapshot_key(snapshot.id()).ok_or_else(|| {
            PersistenceError::Unavailable(format!("unstorable snapshot id '{}'", snapshot.id()))
        })?;
        self.store.put(&key, &bytes)?;
        Ok(())
    }
}

/// Store key of snapshot `id`, or `None` when `id` cannot be a snapshot id.
fn snapshot_key(id: &str) -> Option<String> {
    SNAPSHOT_ID_PATTERN
        .is_match(id)
        .then(|| format!("{SNAPSHOT_PREFIX}{id}"))
}

fn decode(key: &str, bytes: &[u8]) -> std::result::Result<Snapshot, PersistenceError> {
    serde_json::from_slice(bytes).map_err(|e| PersistenceError::Deserialization {
        key: key.to_string(),
        source: e,
    })
}
