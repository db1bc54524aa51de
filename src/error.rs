//! Crate-wide error classification.
//!
//! Each bounded context keeps its own `thiserror` enum. Callers that only
//! need to branch on the broad failure category use [`ErrorKind`], which
//! every error type in the crate exposes through a `kind()` method.

use std::fmt;

/// Broad category of a failure, shared by every component error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed record does not exist.
    NotFound,
    /// A persisted record could not be parsed.
    Corrupted,
    /// Input or record shape violated a rule; nothing was written.
    ValidationFailed,
    /// A lifecycle state change is not permitted by the transition table.
    StateTransitionRejected,
    /// The file system or another persistence layer failed.
    StorageFailure,
}

impl ErrorKind {
    /// Returns a stable snake-case label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Corrupted => "corrupted",
            Self::ValidationFailed => "validation_failed",
            Self::StateTransitionRejected => "state_transition_rejected",
            Self::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
