//! Session kinds and the session lifecycle state machine.

use super::{ParseSessionStateError, ParseSessionTypeError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow phase a session serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    /// Produces the plan and the task graph.
    Planning,
    /// Executes one task.
    Task,
    /// Checks finished work against acceptance criteria.
    Verification,
    /// Free-form work driven by the user.
    Interactive,
}

impl SessionType {
    /// Every session type.
    pub const ALL: [Self; 4] = [
        Self::Planning,
        Self::Task,
        Self::Verification,
        Self::Interactive,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Task => "task",
            Self::Verification => "verification",
            Self::Interactive => "interactive",
        }
    }
}

impl TryFrom<&str> for SessionType {
    type Error = ParseSessionTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| ParseSessionTypeError(value.to_owned()))
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Work is ongoing.
    Active,
    /// Work is on hold and may resume.
    Suspended,
    /// Work finished.
    Completed,
    /// Work stopped on an error; may be reactivated.
    Failed,
}

impl SessionState {
    /// Every state.
    pub const ALL: [Self; 4] = [Self::Active, Self::Suspended, Self::Completed, Self::Failed];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` when no transition leaves this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` for states that end work and stamp `completed_at`.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` when the transition table permits moving to `target`.
    ///
    /// Same-state requests are not in the table; the aggregate treats them
    /// as no-ops instead of errors.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Suspended | Self::Completed | Self::Failed)
                | (Self::Suspended, Self::Active | Self::Completed | Self::Failed)
                | (Self::Failed, Self::Active)
        )
    }
}

impl TryFrom<&str> for SessionState {
    type Error = ParseSessionStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| ParseSessionStateError(value.to_owned()))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
