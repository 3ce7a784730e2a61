//! Data models for the control center.
//!
//! - [`Configuration`]: the live aggregate of ordered [`Section`]s plus versioning metadata
//! - [`Section`]: one toggleable block of CLAUDE.md text, with [`NewSection`] / [`SectionPatch`]
//!   describing creation and edits
//! - [`Snapshot`]: an immutable deep copy of a configuration, with [`ArchiveStats`]
//! - [`AppSettings`]: application settings loaded by [`ConfigManager`](crate::config::ConfigManager)
//!
//! All persisted structs derive `Serialize`/`Deserialize` and use camelCase keys.

pub mod configuration;
pub mod section;
pub mod settings;
pub mod snapshot;

pub use configuration::{
    Activity, ConfigStats, Configuration, DEFAULT_CONFIG_VERSION, MAX_RECENT_ACTIVITY,
    RelatedCounts,
};
pub use section::{
    ContentSize, ContextSet, ContextTag, DEFAULT_PRIORITY, NewSection, Section, SectionPatch,
    Subsection,
};
pub use settings::{AUTOSAVE_DELAY_MS, AppSettings, DEFAULT_DOCUMENT_TITLE, MAX_SNAPSHOTS};
pub use snapshot::{ArchiveStats, DEFAULT_SNAPSHOT_NOTE, PRE_RESTORE_NOTE, Snapshot};
