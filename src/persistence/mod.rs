//! Configuration persistence.
//!
//! - [`BackingStore`]: atomic key/blob storage, with [`FileStore`] (one JSON
//!   file per key, temp file + rename) and [`MemoryStore`]
//! - [`ConfigRepository`]: load/save of the whole configuration, JSON
//!   import/export, fallback to the built-in default
//! - [`default_configuration`]: the starter sections used on first run

mod defaults;
mod repository;
mod store;

pub use defaults::default_configuration;
pub use repository::{CONFIG_KEY, ConfigRepository, parse_import};
pub use store::{BackingStore, FileStore, MemoryStore};

#[cfg(test)]
pub use store::MockBackingStore;
