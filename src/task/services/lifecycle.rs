//! Service layer for creating and mutating tasks.

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::session::domain::SessionId;
use crate::store::BulkOutcome;
use crate::task::{
    domain::{
        Dependency, DependencyGraph, Estimation, NewTask, Task, TaskDomainError, TaskId,
        TaskPriority, TaskStatus,
    },
    ports::{TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskRequest {
    orchestration_id: OrchestrationId,
    name: String,
    description: String,
    priority: TaskPriority,
    acceptance_criteria: Vec<String>,
    estimation: Option<Estimation>,
    dependencies: Vec<Dependency>,
    parent_task_id: Option<TaskId>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(orchestration_id: OrchestrationId, name: impl Into<String>) -> Self {
        Self {
            orchestration_id,
            name: name.into(),
            description: String::new(),
            priority: TaskPriority::default(),
            acceptance_criteria: Vec::new(),
            estimation: None,
            dependencies: Vec::new(),
            parent_task_id: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the acceptance criterion descriptions.
    #[must_use]
    pub fn with_acceptance_criteria(
        mut self,
        criteria: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the effort estimate.
    #[must_use]
    pub const fn with_estimation(mut self, estimation: Estimation) -> Self {
        self.estimation = Some(estimation);
        self
    }

    /// Adds one prerequisite.
    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Replaces the prerequisites.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Sets the parent task.
    #[must_use]
    pub const fn with_parent(mut self, parent_task_id: TaskId) -> Self {
        self.parent_task_id = Some(parent_task_id);
        self
    }
}

/// Partial update of a task. Unset fields are left unchanged.
///
/// The status change is applied first, so a request that completes a task
/// and also sets progress ends with the requested progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTaskRequest {
    name: Option<String>,
    description: Option<String>,
    status: Option<TaskStatus>,
    priority: Option<TaskPriority>,
    progress: Option<u8>,
    estimation: Option<Option<Estimation>>,
    session_id: Option<Option<SessionId>>,
}

impl UpdateTaskRequest {
    /// Creates an empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the task.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Requests a status transition.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Changes the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the completion percentage.
    #[must_use]
    pub const fn with_progress(mut self, percentage: u8) -> Self {
        self.progress = Some(percentage);
        self
    }

    /// Replaces or clears the estimation.
    #[must_use]
    pub const fn with_estimation(mut self, estimation: Option<Estimation>) -> Self {
        self.estimation = Some(estimation);
        self
    }

    /// Links or unlinks the executing session.
    #[must_use]
    pub const fn with_session(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Service-level errors for task graph operations.
#[derive(Debug, Error)]
pub enum TaskGraphError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// The addressed task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The parent task is missing or belongs to another orchestration.
    #[error("invalid parent {parent_task_id}: {reason}")]
    InvalidParent {
        /// Requested parent.
        parent_task_id: TaskId,
        /// Explanation.
        reason: String,
    },
    /// The prerequisite is missing or belongs to another orchestration.
    #[error("task {task_id} cannot depend on {depends_on}: {reason}")]
    InvalidDependency {
        /// Dependent task.
        task_id: TaskId,
        /// Rejected prerequisite.
        depends_on: TaskId,
        /// Explanation.
        reason: String,
    },
    /// The edge would close a dependency cycle.
    #[error("task {task_id} depending on {depends_on} would create a cycle")]
    DependencyCycle {
        /// Dependent task.
        task_id: TaskId,
        /// Rejected prerequisite.
        depends_on: TaskId,
    },
}

impl TaskGraphError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(error) => error.kind(),
            Self::Repository(error) => error.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidParent { .. }
            | Self::InvalidDependency { .. }
            | Self::DependencyCycle { .. } => ErrorKind::ValidationFailed,
        }
    }
}

/// Result type for task graph service operations.
pub type TaskGraphResult<T> = Result<T, TaskGraphError>;

/// Task graph orchestration service.
#[derive(Clone)]
pub struct TaskGraphService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<C>,
}

impl<R, C> TaskGraphService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task graph service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates a `not_started` task.
    ///
    /// Prerequisites are not resolved here; dangling ones surface in
    /// [`TaskGraphService::validate_dependencies`]. A parent must exist in the
    /// same orchestration and records the new task as its child.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::Domain`] for invalid input,
    /// [`TaskGraphError::InvalidParent`] for a bad parent and
    /// [`TaskGraphError::Repository`] when persistence fails.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskGraphResult<Task> {
        let mut parent = None;
        if let Some(parent_task_id) = request.parent_task_id {
            parent = Some(
                self.parent_for(parent_task_id, &request.orchestration_id)
                    .await?,
            );
        }

        let task = Task::new(
            NewTask {
                orchestration_id: request.orchestration_id,
                name: request.name,
                description: request.description,
                priority: request.priority,
                acceptance_criteria: request.acceptance_criteria,
                estimation: request.estimation,
                dependencies: request.dependencies,
                parent_task_id: request.parent_task_id,
            },
            &*self.clock,
        )?;
        self.repository.store(&task).await?;

        if let Some(mut parent) = parent {
            parent.add_child(task.id(), &*self.clock);
            if let Err(error) = self.repository.update(&parent).await {
                warn!(
                    task_id = %task.id(),
                    parent_task_id = %parent.id(),
                    %error,
                    "parent task not updated with new child"
                );
            }
        }
        Ok(task)
    }

    async fn parent_for(
        &self,
        parent_task_id: TaskId,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<Task> {
        let parent = self
            .repository
            .find_by_id(parent_task_id)
            .await?
            .ok_or_else(|| TaskGraphError::InvalidParent {
                parent_task_id,
                reason: "parent task does not exist".to_owned(),
            })?;
        if parent.orchestration_id() != orchestration_id {
            return Err(TaskGraphError::InvalidParent {
                parent_task_id,
                reason: format!(
                    "parent belongs to orchestration {}",
                    parent.orchestration_id()
                ),
            });
        }
        Ok(parent)
    }

    /// Returns a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::Repository`] when the lookup fails.
    pub async fn get_task(&self, task_id: TaskId) -> TaskGraphResult<Option<Task>> {
        Ok(self.repository.find_by_id(task_id).await?)
    }

    pub(super) async fn require(&self, task_id: TaskId) -> TaskGraphResult<Task> {
        self.repository
            .find_by_id(task_id)
            .await?
            .ok_or(TaskGraphError::NotFound(task_id))
    }

    /// Applies `delta` to a task and persists it.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::NotFound`] for an unknown task and
    /// [`TaskGraphError::Domain`] when the status change is not permitted
    /// (including same-status requests) or a field is invalid. Nothing is
    /// written on error.
    pub async fn update_task(
        &self,
        task_id: TaskId,
        delta: UpdateTaskRequest,
    ) -> TaskGraphResult<Task> {
        let mut task = self.require(task_id).await?;
        let clock = &*self.clock;
        if let Some(status) = delta.status {
            task.transition_to(status, clock)?;
        }
        if let Some(name) = delta.name {
            task.rename(&name, clock)?;
        }
        if let Some(description) = delta.description {
            task.set_description(description, clock);
        }
        if let Some(priority) = delta.priority {
            task.set_priority(priority, clock);
        }
        if let Some(estimation) = delta.estimation {
            task.set_estimation(estimation, clock)?;
        }
        if let Some(percentage) = delta.progress {
            task.set_progress(percentage, clock)?;
        }
        if let Some(session_id) = delta.session_id {
            task.assign_session(session_id, clock);
        }
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Sets a task's completion percentage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::NotFound`] for an unknown task and
    /// [`TaskGraphError::Domain`] above 100.
    pub async fn update_progress(&self, task_id: TaskId, percentage: u8) -> TaskGraphResult<Task> {
        let mut task = self.require(task_id).await?;
        task.set_progress(percentage, &*self.clock)?;
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Marks acceptance criterion `index` as met or unmet.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::NotFound`] for an unknown task and
    /// [`TaskGraphError::Domain`] for an unknown index.
    pub async fn set_criterion_met(
        &self,
        task_id: TaskId,
        index: usize,
        met: bool,
    ) -> TaskGraphResult<Task> {
        let mut task = self.require(task_id).await?;
        task.set_criterion_met(index, met, &*self.clock)?;
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Links or unlinks the session executing a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::NotFound`] for an unknown task.
    pub async fn assign_session(
        &self,
        task_id: TaskId,
        session_id: Option<SessionId>,
    ) -> TaskGraphResult<Task> {
        let mut task = self.require(task_id).await?;
        task.assign_session(session_id, &*self.clock);
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Adds a prerequisite to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::Domain`] for self or duplicate edges,
    /// [`TaskGraphError::InvalidDependency`] when the prerequisite is missing
    /// or lives in another orchestration and
    /// [`TaskGraphError::DependencyCycle`] when the edge would close a cycle.
    pub async fn add_dependency(
        &self,
        task_id: TaskId,
        dependency: Dependency,
    ) -> TaskGraphResult<Task> {
        let mut task = self.require(task_id).await?;
        if dependency.task_id == task_id {
            return Err(TaskDomainError::SelfDependency(task_id).into());
        }
        if task.depends_on(dependency.task_id) {
            return Err(TaskDomainError::DuplicateDependency {
                task_id,
                depends_on: dependency.task_id,
            }
            .into());
        }

        let Some(prerequisite) = self.repository.find_by_id(dependency.task_id).await? else {
            return Err(TaskGraphError::InvalidDependency {
                task_id,
                depends_on: dependency.task_id,
                reason: "prerequisite does not exist".to_owned(),
            });
        };
        if prerequisite.orchestration_id() != task.orchestration_id() {
            return Err(TaskGraphError::InvalidDependency {
                task_id,
                depends_on: dependency.task_id,
                reason: format!(
                    "prerequisite belongs to orchestration {}",
                    prerequisite.orchestration_id()
                ),
            });
        }

        let snapshot = self.snapshot(task.orchestration_id()).await?;
        if DependencyGraph::build(&snapshot).would_create_cycle(task_id, dependency.task_id) {
            return Err(TaskGraphError::DependencyCycle {
                task_id,
                depends_on: dependency.task_id,
            });
        }

        task.add_dependency(dependency, &*self.clock)?;
        self.repository.update(&task).await?;
        Ok(task)
    }

    /// Removes every task of the orchestration.
    ///
    /// Each removal is attempted independently; failures are reported in
    /// the outcome instead of aborting the run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskGraphError::Repository`] when the tasks cannot be
    /// listed.
    pub async fn reset_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<BulkOutcome> {
        let tasks = self.repository.find_by_orchestration(orchestration_id).await?;
        let mut outcome = BulkOutcome::default();
        for task in tasks {
            match self.repository.remove(task.id()).await {
                Ok(removal) => outcome.record_removal(&removal),
                Err(error) => outcome.record_failure(task.id().to_string(), &error),
            }
        }
        info!(
            orchestration_id = %orchestration_id,
            removed = outcome.removed,
            backed_up = outcome.backed_up,
            failed = outcome.failed,
            "orchestration tasks reset"
        );
        Ok(outcome)
    }
}
