//! Task aggregate root and its value types.

use super::{Dependency, TaskDomainError, TaskId, TaskPriority, TaskStatus};
use crate::OrchestrationId;
use crate::session::domain::SessionId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Completion percentage and when it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    /// Completion percentage, 0 to 100.
    pub completion_percentage: u8,
    /// When the percentage last changed.
    pub updated_at: DateTime<Utc>,
}

/// A verifiable condition for calling a task done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceCriterion {
    /// What must hold.
    pub description: String,
    /// Whether verification found it to hold.
    #[serde(default)]
    pub met: bool,
}

/// Effort estimate for a task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    /// Estimated effort in hours, never negative.
    pub effort_hours: f64,
    /// Confidence in the estimate, within 0 to 1.
    pub confidence: f64,
}

impl Estimation {
    /// Creates a validated estimation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidEstimation`] when the effort is
    /// negative or not finite, or the confidence lies outside 0 to 1.
    pub fn new(effort_hours: f64, confidence: f64) -> Result<Self, TaskDomainError> {
        let estimation = Self {
            effort_hours,
            confidence,
        };
        if estimation.is_valid() {
            Ok(estimation)
        } else {
            Err(TaskDomainError::InvalidEstimation {
                effort_hours,
                confidence,
            })
        }
    }

    /// Returns `true` when both values are within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.effort_hours.is_finite()
            && self.effort_hours >= 0.0
            && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Owning orchestration.
    pub orchestration_id: OrchestrationId,
    /// Task name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Priority.
    pub priority: TaskPriority,
    /// Acceptance criterion descriptions; each starts unmet.
    pub acceptance_criteria: Vec<String>,
    /// Optional effort estimate.
    pub estimation: Option<Estimation>,
    /// Prerequisites.
    pub dependencies: Vec<Dependency>,
    /// Optional parent task.
    pub parent_task_id: Option<TaskId>,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    orchestration_id: OrchestrationId,
    name: String,
    #[serde(default)]
    description: String,
    status: TaskStatus,
    #[serde(default)]
    priority: TaskPriority,
    progress: TaskProgress,
    #[serde(default)]
    acceptance_criteria: Vec<AcceptanceCriterion>,
    #[serde(default)]
    estimation: Option<Estimation>,
    #[serde(default)]
    dependencies: Vec<Dependency>,
    #[serde(default)]
    parent_task_id: Option<TaskId>,
    #[serde(default)]
    child_task_ids: Vec<TaskId>,
    #[serde(default)]
    session_id: Option<SessionId>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted orchestration.
    pub orchestration_id: OrchestrationId,
    /// Persisted name.
    pub name: String,
    /// Persisted description.
    pub description: String,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted progress.
    pub progress: TaskProgress,
    /// Persisted acceptance criteria.
    pub acceptance_criteria: Vec<AcceptanceCriterion>,
    /// Persisted estimation.
    pub estimation: Option<Estimation>,
    /// Persisted dependencies.
    pub dependencies: Vec<Dependency>,
    /// Persisted parent task.
    pub parent_task_id: Option<TaskId>,
    /// Persisted child tasks.
    pub child_task_ids: Vec<TaskId>,
    /// Persisted executing session.
    pub session_id: Option<SessionId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted start timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a `not_started` task with every acceptance criterion unmet.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when the name is blank, the estimation is
    /// out of range or the dependency list repeats a prerequisite.
    pub fn new(request: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(TaskDomainError::EmptyName);
        }
        if let Some(estimation) = request.estimation {
            Estimation::new(estimation.effort_hours, estimation.confidence)?;
        }

        let id = TaskId::new();
        let mut seen = HashSet::new();
        for dependency in &request.dependencies {
            if !seen.insert(dependency.task_id) {
                return Err(TaskDomainError::DuplicateDependency {
                    task_id: id,
                    depends_on: dependency.task_id,
                });
            }
        }

        let timestamp = clock.utc();
        Ok(Self {
            id,
            orchestration_id: request.orchestration_id,
            name: name.to_owned(),
            description: request.description,
            status: TaskStatus::NotStarted,
            priority: request.priority,
            progress: TaskProgress {
                completion_percentage: 0,
                updated_at: timestamp,
            },
            acceptance_criteria: request
                .acceptance_criteria
                .into_iter()
                .map(|description| AcceptanceCriterion {
                    description,
                    met: false,
                })
                .collect(),
            estimation: request.estimation,
            dependencies: request.dependencies,
            parent_task_id: request.parent_task_id,
            child_task_ids: Vec::new(),
            session_id: None,
            created_at: timestamp,
            started_at: None,
            completed_at: None,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            orchestration_id: data.orchestration_id,
            name: data.name,
            description: data.description,
            status: data.status,
            priority: data.priority,
            progress: data.progress,
            acceptance_criteria: data.acceptance_criteria,
            estimation: data.estimation,
            dependencies: data.dependencies,
            parent_task_id: data.parent_task_id,
            child_task_ids: data.child_task_ids,
            session_id: data.session_id,
            created_at: data.created_at,
            started_at: data.started_at,
            completed_at: data.completed_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning orchestration.
    #[must_use]
    pub const fn orchestration_id(&self) -> &OrchestrationId {
        &self.orchestration_id
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the progress.
    #[must_use]
    pub const fn progress(&self) -> TaskProgress {
        self.progress
    }

    /// Returns the acceptance criteria.
    #[must_use]
    pub fn acceptance_criteria(&self) -> &[AcceptanceCriterion] {
        &self.acceptance_criteria
    }

    /// Returns the estimation, if any.
    #[must_use]
    pub const fn estimation(&self) -> Option<Estimation> {
        self.estimation
    }

    /// Returns the prerequisites.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Returns the parent task, if any.
    #[must_use]
    pub const fn parent_task_id(&self) -> Option<TaskId> {
        self.parent_task_id
    }

    /// Returns the child tasks.
    #[must_use]
    pub fn child_task_ids(&self) -> &[TaskId] {
        &self.child_task_ids
    }

    /// Returns the executing session, if any.
    #[must_use]
    pub const fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when work first left `not_started`, if it has.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns the completion timestamp, if completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to `target`.
    ///
    /// Leaving `not_started` stamps `started_at`; reaching `completed`
    /// stamps `completed_at` and sets progress to 100.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStateTransition`] when the
    /// transition table does not permit the change, including same-status
    /// requests.
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStateTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        let now = clock.utc();
        if self.status == TaskStatus::NotStarted {
            self.started_at = Some(now);
        }
        if target == TaskStatus::Completed {
            self.completed_at = Some(now);
            self.progress = TaskProgress {
                completion_percentage: 100,
                updated_at: now,
            };
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Renames the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyName`] when the name is blank.
    pub fn rename(&mut self, name: &str, clock: &impl Clock) -> Result<(), TaskDomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyName);
        }
        trimmed.clone_into(&mut self.name);
        self.touch(clock);
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: String, clock: &impl Clock) {
        self.description = description;
        self.touch(clock);
    }

    /// Changes the priority.
    pub fn set_priority(&mut self, priority: TaskPriority, clock: &impl Clock) {
        self.priority = priority;
        self.touch(clock);
    }

    /// Replaces or clears the estimation.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidEstimation`] when out of range.
    pub fn set_estimation(
        &mut self,
        estimation: Option<Estimation>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if let Some(value) = estimation {
            Estimation::new(value.effort_hours, value.confidence)?;
        }
        self.estimation = estimation;
        self.touch(clock);
        Ok(())
    }

    /// Sets the completion percentage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidProgress`] above 100.
    pub fn set_progress(&mut self, percentage: u8, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if percentage > 100 {
            return Err(TaskDomainError::InvalidProgress(percentage));
        }
        let now = clock.utc();
        self.progress = TaskProgress {
            completion_percentage: percentage,
            updated_at: now,
        };
        self.updated_at = now;
        Ok(())
    }

    /// Marks acceptance criterion `index` as met or unmet.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::CriterionOutOfRange`] for an unknown index.
    pub fn set_criterion_met(
        &mut self,
        index: usize,
        met: bool,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let len = self.acceptance_criteria.len();
        let criterion = self.acceptance_criteria.get_mut(index).ok_or(
            TaskDomainError::CriterionOutOfRange {
                task_id: self.id,
                index,
                len,
            },
        )?;
        criterion.met = met;
        self.touch(clock);
        Ok(())
    }

    /// Links or unlinks the session executing this task.
    pub fn assign_session(&mut self, session_id: Option<SessionId>, clock: &impl Clock) {
        self.session_id = session_id;
        self.touch(clock);
    }

    /// Adds a prerequisite.
    ///
    /// Cycle and existence checks need the whole graph and are made by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::SelfDependency`] or
    /// [`TaskDomainError::DuplicateDependency`].
    pub fn add_dependency(
        &mut self,
        dependency: Dependency,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if dependency.task_id == self.id {
            return Err(TaskDomainError::SelfDependency(self.id));
        }
        if self.depends_on(dependency.task_id) {
            return Err(TaskDomainError::DuplicateDependency {
                task_id: self.id,
                depends_on: dependency.task_id,
            });
        }
        self.dependencies.push(dependency);
        self.touch(clock);
        Ok(())
    }

    /// Returns `true` when `task_id` is a prerequisite of this task.
    #[must_use]
    pub fn depends_on(&self, task_id: TaskId) -> bool {
        self.dependencies
            .iter()
            .any(|dependency| dependency.task_id == task_id)
    }

    /// Records `child` as a subtask; repeated children are ignored.
    pub fn add_child(&mut self, child: TaskId, clock: &impl Clock) {
        if !self.child_task_ids.contains(&child) {
            self.child_task_ids.push(child);
            self.touch(clock);
        }
    }

    /// Returns every shape rule the task violates.
    #[must_use]
    pub fn shape_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.orchestration_id.is_blank() {
            violations.push("orchestrationId must not be empty".to_owned());
        }
        if self.name.trim().is_empty() {
            violations.push("name must not be empty".to_owned());
        }
        if self.progress.completion_percentage > 100 {
            violations.push(format!(
                "progress {} exceeds 100",
                self.progress.completion_percentage
            ));
        }
        if self.estimation.is_some_and(|estimation| !estimation.is_valid()) {
            violations.push("estimation is out of range".to_owned());
        }
        let mut seen = HashSet::new();
        for dependency in &self.dependencies {
            if dependency.task_id == self.id {
                violations.push("task depends on itself".to_owned());
            } else if !seen.insert(dependency.task_id) {
                violations.push(format!("duplicate dependency on {}", dependency.task_id));
            }
        }
        violations
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
