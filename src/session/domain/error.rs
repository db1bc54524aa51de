//! Error types for session domain validation and parsing.

use super::{SessionId, SessionState, ThinkingState};
use crate::ErrorKind;
use thiserror::Error;

/// Errors returned while constructing or mutating session values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionDomainError {
    /// The requested state change is not in the transition table.
    #[error("session {session_id} cannot move from {} to {}", from.as_str(), to.as_str())]
    InvalidStateTransition {
        /// Session being changed.
        session_id: SessionId,
        /// Current state.
        from: SessionState,
        /// Requested state.
        to: SessionState,
    },

    /// A session cannot be its own parent or child.
    #[error("session {0} cannot be related to itself")]
    SelfReference(SessionId),

    /// A reasoning trace is already open.
    #[error("session {0} already has an open thinking trace")]
    ThinkingAlreadyActive(SessionId),

    /// No reasoning trace has been started.
    #[error("session {0} has no thinking trace")]
    NoThinkingSession(SessionId),

    /// The trace is not in the state the operation needs.
    #[error("thinking trace of session {session_id} is {}", state.as_str())]
    ThinkingNotActive {
        /// Session owning the trace.
        session_id: SessionId,
        /// Current trace state.
        state: ThinkingState,
    },

    /// A step reference points outside the recorded steps.
    #[error("{field} refers to step {step} but only {len} steps exist")]
    InvalidThinkingReference {
        /// Referencing field.
        field: &'static str,
        /// Referenced step number.
        step: u32,
        /// Number of recorded steps.
        len: usize,
    },

    /// A branch identifier was given without a branch origin.
    #[error("branch identifier requires branch_from_step")]
    BranchWithoutOrigin,

    /// A thinking step has no text.
    #[error("thought must not be empty")]
    EmptyThought,

    /// An artifact has no name.
    #[error("artifact name must not be empty")]
    EmptyArtifactName,

    /// A decision has no text.
    #[error("decision must not be empty")]
    EmptyDecision,

    /// A context variable has no key.
    #[error("variable name must not be empty")]
    EmptyVariableName,
}

impl SessionDomainError {
    /// Returns the broad failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStateTransition { .. }
            | Self::ThinkingAlreadyActive(_)
            | Self::ThinkingNotActive { .. } => ErrorKind::StateTransitionRejected,
            Self::NoThinkingSession(_) => ErrorKind::NotFound,
            Self::SelfReference(_)
            | Self::InvalidThinkingReference { .. }
            | Self::BranchWithoutOrigin
            | Self::EmptyThought
            | Self::EmptyArtifactName
            | Self::EmptyDecision
            | Self::EmptyVariableName => ErrorKind::ValidationFailed,
        }
    }
}

/// Error returned while parsing session types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session type: {0}")]
pub struct ParseSessionTypeError(pub String);

/// Error returned while parsing session states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown session state: {0}")]
pub struct ParseSessionStateError(pub String);
