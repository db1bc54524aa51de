//! Typed dependency edges and their satisfaction rules.

use super::{ParseDependencyTypeError, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporal relation between a prerequisite and a dependent task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The prerequisite must finish before the dependent starts.
    #[default]
    FinishToStart,
    /// The prerequisite must start before the dependent starts.
    StartToStart,
    /// The prerequisite must finish before the dependent finishes.
    FinishToFinish,
    /// The prerequisite must start before the dependent finishes.
    StartToFinish,
}

impl DependencyType {
    /// Every dependency type.
    pub const ALL: [Self; 4] = [
        Self::FinishToStart,
        Self::StartToStart,
        Self::FinishToFinish,
        Self::StartToFinish,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FinishToStart => "finish_to_start",
            Self::StartToStart => "start_to_start",
            Self::FinishToFinish => "finish_to_finish",
            Self::StartToFinish => "start_to_finish",
        }
    }

    /// Returns `true` when a prerequisite in `status` satisfies this edge.
    #[must_use]
    pub const fn is_satisfied_by(self, status: TaskStatus) -> bool {
        match self {
            Self::FinishToStart | Self::FinishToFinish => matches!(status, TaskStatus::Completed),
            Self::StartToStart | Self::StartToFinish => {
                matches!(status, TaskStatus::InProgress | TaskStatus::Completed)
            }
        }
    }

    const fn requirement(self) -> &'static str {
        match self {
            Self::FinishToStart | Self::FinishToFinish => "must be completed",
            Self::StartToStart | Self::StartToFinish => "must be in progress or completed",
        }
    }
}

impl TryFrom<&str> for DependencyType {
    type Error = ParseDependencyTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| ParseDependencyTypeError(value.to_owned()))
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge embedded in the dependent task: this task depends on `task_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// The prerequisite task.
    pub task_id: TaskId,
    /// Temporal relation to the prerequisite.
    #[serde(rename = "type", default)]
    pub dependency_type: DependencyType,
}

impl Dependency {
    /// Creates a typed dependency on `task_id`.
    #[must_use]
    pub const fn new(task_id: TaskId, dependency_type: DependencyType) -> Self {
        Self {
            task_id,
            dependency_type,
        }
    }

    /// Creates a finish-to-start dependency on `task_id`.
    #[must_use]
    pub const fn finish_to_start(task_id: TaskId) -> Self {
        Self::new(task_id, DependencyType::FinishToStart)
    }
}

/// A dependency that does not currently hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsatisfiedDependency {
    /// The edge.
    pub dependency: Dependency,
    /// Current status of the prerequisite; `None` when it does not exist.
    pub current_status: Option<TaskStatus>,
    /// Human-readable explanation.
    pub reason: String,
}

/// Satisfaction report for every dependency of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCheck {
    /// Task whose dependencies were checked.
    pub task_id: TaskId,
    /// `true` when every dependency holds.
    pub all_satisfied: bool,
    /// Dependencies that hold.
    pub satisfied: Vec<Dependency>,
    /// Dependencies that do not hold.
    pub unsatisfied: Vec<UnsatisfiedDependency>,
    /// Prerequisites currently holding the task back.
    pub blocked_by: Vec<TaskId>,
}

impl DependencyCheck {
    /// Evaluates `task`'s dependencies against prerequisites resolved by
    /// `lookup`.
    pub fn evaluate<'a>(task: &Task, lookup: impl Fn(TaskId) -> Option<&'a Task>) -> Self {
        let mut satisfied = Vec::new();
        let mut unsatisfied = Vec::new();
        for dependency in task.dependencies() {
            let kind = dependency.dependency_type;
            match lookup(dependency.task_id) {
                Some(prerequisite) if kind.is_satisfied_by(prerequisite.status()) => {
                    satisfied.push(*dependency);
                }
                Some(prerequisite) => unsatisfied.push(UnsatisfiedDependency {
                    dependency: *dependency,
                    current_status: Some(prerequisite.status()),
                    reason: format!(
                        "{kind}: '{}' {} but is {}",
                        prerequisite.name(),
                        kind.requirement(),
                        prerequisite.status()
                    ),
                }),
                None => unsatisfied.push(UnsatisfiedDependency {
                    dependency: *dependency,
                    current_status: None,
                    reason: format!("{kind}: task {} does not exist", dependency.task_id),
                }),
            }
        }
        let blocked_by = unsatisfied
            .iter()
            .map(|entry| entry.dependency.task_id)
            .collect();
        Self {
            task_id: task.id(),
            all_satisfied: unsatisfied.is_empty(),
            satisfied,
            unsatisfied,
            blocked_by,
        }
    }
}
