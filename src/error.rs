//! Error types for the control center library.
//!
//! Section and document operations are pure and fail only with
//! [`ControlError::NotFound`] or [`ControlError::Validation`]. Anything that
//! touches the backing store can additionally fail with a
//! [`PersistenceError`], which callers are expected to surface to the user.

use thiserror::Error;

/// Failure of a backing store or of (de)serializing a stored blob.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} {key}")]
    Io {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete write of {key}")]
    AtomicWriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Failed to serialize {what}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Stored payload is corrupt or has the wrong shape.
    #[error("Failed to deserialize {key}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store cannot be reached at all.
    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { operation, key, .. } => format!("Could not {operation} '{key}'"),
            Self::AtomicWriteFailed { key, .. } => format!(
                "Could not finish saving '{key}'. Please check disk space and permissions."
            ),
            Self::Serialization { what, .. } => {
                format!("An error occurred while encoding the {what}.")
            }
            Self::Deserialization { key, .. } => format!(
                "The stored data in '{key}' could not be read. It may be corrupted."
            ),
            Self::Unavailable(reason) => format!("Storage is unavailable: {reason}"),
        }
    }
}

/// Errors returned by section, archive and repository operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// An operation referenced a section or snapshot id that does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: EntityKind, id: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Imported configuration is malformed; nothing was applied.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl ControlError {
    pub fn section_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Section,
            id: id.into(),
        }
    }

    pub fn snapshot_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: EntityKind::Snapshot,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// What kind of record a [`ControlError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Section,
    Snapshot,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Section => f.write_str("Section"),
            Self::Snapshot => f.write_str("Snapshot"),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, ControlError>;
