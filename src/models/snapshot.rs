use super::configuration::Configuration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Note attached to snapshots created without one.
pub const DEFAULT_SNAPSHOT_NOTE: &str = "Auto-generated snapshot";

/// Note attached to the backup taken right before a restore.
pub const PRE_RESTORE_NOTE: &str = "pre-restore backup";

/// Immutable, timestamped copy of a [`Configuration`].
///
/// Fields are read-only; a snapshot is never changed after capture. `data`
/// is an owned deep copy and shares nothing with the live configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    id: String,
    version: String,
    data: Configuration,
    created_at: DateTime<Utc>,
    note: String,
    /// Insertion number within the archive; breaks `created_at` ties.
    #[serde(default)]
    sequence: u64,
}

impl Snapshot {
    pub(crate) fn capture(
        id: String,
        config: &Configuration,
        created_at: DateTime<Utc>,
        note: String,
        sequence: u64,
    ) -> Self {
        Self {
            id,
            version: config.version.clone(),
            data: config.clone(),
            created_at,
            note,
            sequence,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn data(&self) -> &Configuration {
        &self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Sort key giving a total order: creation time, then insertion number.
    pub fn age_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }

    /// Serialized byte length of `data`, used for archive size estimates.
    pub fn data_size(&self) -> usize {
        serde_json::to_vec(&self.data).map_or(0, |bytes| bytes.len())
    }
}

/// Read-only summary of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStats {
    pub total_snapshots: usize,
    pub current_version: String,
    pub last_backup_time: Option<DateTime<Utc>>,
    pub total_size_estimate: usize,
}

impl ArchiveStats {
    pub fn total_size_kb(&self) -> String {
        format!("{:.1}", self.total_size_estimate as f64 / 1024.0)
    }
}
