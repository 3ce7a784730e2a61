// Control Center - versioned CLAUDE.md configuration
//
// Library crate with the section store, document generator, persistence,
// snapshot archive and debounced auto-save. The binary crate (main.rs)
// provides the command-line entry point.

pub mod archive;
pub mod autosave;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod persistence;
pub mod sections;
pub mod state;
pub mod templates;
pub mod workspace;

// Re-export commonly used types for convenience
pub use archive::{ArchiveManager, RestoreOutcome};
pub use autosave::{AutoSaveCoordinator, AutoSaveStatus, ScheduledSave};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ConfigManager;
pub use error::{ControlError, PersistenceError};
pub use export::{ExportSink, FileExportSink};
pub use generator::DocumentGenerator;
pub use models::{AppSettings, Configuration, NewSection, Section, SectionPatch, Snapshot};
pub use persistence::{BackingStore, ConfigRepository, FileStore, MemoryStore};
pub use state::{ConfigChange, ConfigState};
pub use workspace::Workspace;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
