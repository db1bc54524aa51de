//! Error types for plan validation.

use crate::ErrorKind;
use crate::task::domain::TaskId;
use thiserror::Error;

/// Errors returned while constructing or mutating plans.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanDomainError {
    /// The plan title is empty after trimming.
    #[error("plan title must not be empty")]
    EmptyTitle,

    /// A requirement is empty after trimming.
    #[error("plan requirements must not be empty")]
    EmptyRequirement,

    /// The task list names the same task twice.
    #[error("task {0} is listed more than once")]
    DuplicateTask(TaskId),
}

impl PlanDomainError {
    /// Returns the broad failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyTitle | Self::EmptyRequirement | Self::DuplicateTask(_) => {
                ErrorKind::ValidationFailed
            }
        }
    }
}
