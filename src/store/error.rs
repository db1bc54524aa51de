//! Error types for the persistent store.

use super::RecordKind;
use crate::ErrorKind;
use camino::Utf8PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by record stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No record with the identifier exists.
    #[error("{kind} record not found: {id}")]
    NotFound {
        /// Record kind.
        kind: RecordKind,
        /// Record identifier.
        id: String,
    },

    /// The persisted document could not be parsed.
    #[error("{kind} record {id} is corrupted ({path}): {reason}")]
    Corrupted {
        /// Record kind.
        kind: RecordKind,
        /// Record identifier.
        id: String,
        /// File holding the damaged document.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The record violated shape rules; nothing was written.
    #[error("{kind} record {id} failed validation: {}", .violations.join("; "))]
    ValidationFailed {
        /// Record kind.
        kind: RecordKind,
        /// Record identifier.
        id: String,
        /// Every violated rule.
        violations: Vec<String>,
    },

    /// The identifier cannot name a file inside the store.
    #[error("invalid {kind} record identifier '{id}'")]
    InvalidId {
        /// Record kind.
        kind: RecordKind,
        /// Offending identifier.
        id: String,
    },

    /// The file lock stayed contended for every write attempt.
    #[error("write to {path} still locked after {attempts} attempts")]
    LockContention {
        /// Target file.
        path: Utf8PathBuf,
        /// Attempts made.
        attempts: u32,
    },

    /// A backup no longer matches the checksum recorded when it was taken.
    #[error("backup {path} failed checksum verification")]
    BackupChecksumMismatch {
        /// Backup file.
        path: Utf8PathBuf,
    },

    /// The record could not be serialized.
    #[error("failed to serialize {kind} record {id}: {message}")]
    Serialization {
        /// Record kind.
        kind: RecordKind,
        /// Record identifier.
        id: String,
        /// Serializer diagnostic.
        message: String,
    },

    /// File-system failure.
    #[error("storage failure at {path}: {error}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        error: Arc<std::io::Error>,
    },
}

impl StoreError {
    /// Wraps an I/O error raised while accessing `path`.
    pub fn io(path: impl Into<Utf8PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error: Arc::new(error),
        }
    }

    /// Returns the broad failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Corrupted { .. } | Self::BackupChecksumMismatch { .. } => ErrorKind::Corrupted,
            Self::ValidationFailed { .. } | Self::InvalidId { .. } => ErrorKind::ValidationFailed,
            Self::LockContention { .. } | Self::Serialization { .. } | Self::Io { .. } => {
                ErrorKind::StorageFailure
            }
        }
    }
}
