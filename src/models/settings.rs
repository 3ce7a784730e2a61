use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Maximum number of snapshots retained before the oldest are evicted.
pub const MAX_SNAPSHOTS: usize = 20;

/// Quiet period after the last edit before auto-save writes it back.
pub const AUTOSAVE_DELAY_MS: u64 = 2000;

/// Title rendered in the generated document header.
pub const DEFAULT_DOCUMENT_TITLE: &str = "Claude Configuration";

/// Application settings from `control-center.yaml` and `CC_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory holding the stored configuration and snapshots.
    #[serde(default = "default_data_dir")]
    pub data_dir: Utf8PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: Utf8PathBuf,

    /// Directory exported documents are written to.
    #[serde(default = "default_export_dir")]
    pub export_dir: Utf8PathBuf,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_snapshot_retention")]
    pub snapshot_retention: usize,

    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,

    #[serde(default = "default_document_title")]
    pub document_title: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_dir: default_log_dir(),
            export_dir: default_export_dir(),
            debug_mode: false,
            snapshot_retention: MAX_SNAPSHOTS,
            autosave_debounce_ms: AUTOSAVE_DELAY_MS,
            document_title: DEFAULT_DOCUMENT_TITLE.to_string(),
        }
    }
}

impl AppSettings {
    pub fn autosave_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.autosave_debounce_ms)
    }
}

fn default_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("data")
}

fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}

fn default_export_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

fn default_snapshot_retention() -> usize {
    MAX_SNAPSHOTS
}

fn default_autosave_debounce_ms() -> u64 {
    AUTOSAVE_DELAY_MS
}

fn default_document_title() -> String {
    DEFAULT_DOCUMENT_TITLE.to_string()
}
