//! Read-only graph queries over one orchestration's tasks.

use super::{TaskGraphResult, TaskGraphService};
use crate::OrchestrationId;
use crate::task::{
    domain::{
        DependencyCheck, DependencyGraph, DependencyLevels, DependencyValidation, ExecutionOrder,
        Task, TaskId, TaskStatistics, TaskStatus,
    },
    ports::TaskRepository,
};
use mockable::Clock;
use std::cmp::Reverse;
use std::collections::HashMap;

impl<R, C> TaskGraphService<R, C>
where
    R: TaskRepository,
    C: Clock + Send + Sync,
{
    /// Loads the orchestration's tasks in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn snapshot(&self, orchestration_id: &OrchestrationId) -> TaskGraphResult<Vec<Task>> {
        let mut tasks = self.repository.find_by_orchestration(orchestration_id).await?;
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    /// Picks the next `not_started` task to work on.
    ///
    /// Tasks without dependencies come first, then higher priority, then
    /// earlier creation. The choice does not look at whether the chosen
    /// task's dependencies hold; see
    /// [`TaskGraphService::check_dependencies`].
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn get_next_task(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<Option<Task>> {
        let tasks = self.snapshot(orchestration_id).await?;
        Ok(tasks
            .into_iter()
            .filter(|task| task.status() == TaskStatus::NotStarted)
            .min_by_key(|task| {
                (
                    !task.dependencies().is_empty(),
                    Reverse(task.priority()),
                    task.created_at(),
                    task.id(),
                )
            }))
    }

    /// Evaluates whether each dependency of a task currently holds.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::NotFound`] for an unknown task.
    pub async fn check_dependencies(&self, task_id: TaskId) -> TaskGraphResult<DependencyCheck> {
        let task = self.require(task_id).await?;
        let mut prerequisites: HashMap<TaskId, Task> = HashMap::new();
        for dependency in task.dependencies() {
            if let Some(prerequisite) = self.repository.find_by_id(dependency.task_id).await? {
                if prerequisite.orchestration_id() == task.orchestration_id() {
                    prerequisites.insert(prerequisite.id(), prerequisite);
                }
            }
        }
        Ok(DependencyCheck::evaluate(&task, |id| prerequisites.get(&id)))
    }

    /// Reports cycles, dangling dependencies and orphaned subtasks.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn validate_dependencies(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<DependencyValidation> {
        let tasks = self.snapshot(orchestration_id).await?;
        Ok(DependencyGraph::build(&tasks).validation())
    }

    /// Orders the orchestration's tasks so every prerequisite precedes its
    /// dependents.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn compute_execution_order(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<ExecutionOrder> {
        let tasks = self.snapshot(orchestration_id).await?;
        Ok(DependencyGraph::build(&tasks).execution_order())
    }

    /// Groups the orchestration's tasks by dependency depth.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn compute_levels(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<DependencyLevels> {
        let tasks = self.snapshot(orchestration_id).await?;
        Ok(DependencyGraph::build(&tasks).levels())
    }

    /// Summarizes the orchestration's tasks.
    ///
    /// # Errors
    ///
    /// Returns [`super::TaskGraphError::Repository`] when the tasks cannot
    /// be listed.
    pub async fn task_statistics(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskGraphResult<TaskStatistics> {
        let tasks = self.snapshot(orchestration_id).await?;
        Ok(TaskStatistics::from_tasks(&tasks))
    }
}
