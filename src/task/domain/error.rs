//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus};
use crate::ErrorKind;
use thiserror::Error;

/// Errors returned while constructing or mutating task values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskDomainError {
    /// The requested status change is not in the transition table.
    #[error("task {task_id} cannot move from {} to {}", from.as_str(), to.as_str())]
    InvalidStateTransition {
        /// Task being changed.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The task name is empty after trimming.
    #[error("task name must not be empty")]
    EmptyName,

    /// Completion percentage outside 0..=100.
    #[error("progress {0} is out of range, expected 0-100")]
    InvalidProgress(u8),

    /// Effort or confidence outside the accepted range.
    #[error("invalid estimation: effort {effort_hours}h must be >= 0 and confidence {confidence} within 0-1")]
    InvalidEstimation {
        /// Estimated effort in hours.
        effort_hours: f64,
        /// Confidence in the estimate.
        confidence: f64,
    },

    /// An acceptance criterion index does not exist.
    #[error("task {task_id} has {len} acceptance criteria, index {index} is out of range")]
    CriterionOutOfRange {
        /// Task being changed.
        task_id: TaskId,
        /// Requested index.
        index: usize,
        /// Number of criteria.
        len: usize,
    },

    /// A task cannot depend on itself.
    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    /// The dependency edge already exists.
    #[error("task {task_id} already depends on {depends_on}")]
    DuplicateDependency {
        /// Dependent task.
        task_id: TaskId,
        /// Prerequisite task.
        depends_on: TaskId,
    },
}

impl TaskDomainError {
    /// Returns the broad failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStateTransition { .. } => ErrorKind::StateTransitionRejected,
            Self::EmptyName
            | Self::InvalidProgress(_)
            | Self::InvalidEstimation { .. }
            | Self::CriterionOutOfRange { .. }
            | Self::SelfDependency(_)
            | Self::DuplicateDependency { .. } => ErrorKind::ValidationFailed,
        }
    }
}

/// Error returned while parsing task statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task priorities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);

/// Error returned while parsing dependency types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown dependency type: {0}")]
pub struct ParseDependencyTypeError(pub String);
