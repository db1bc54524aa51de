//! Service layer for creating and revising plans.

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::plan::{
    domain::{NewPlan, Plan, PlanDomainError, PlanId},
    ports::{PlanRepository, PlanRepositoryError},
};
use crate::store::BulkOutcome;
use crate::task::domain::TaskId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Request payload for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePlanRequest {
    orchestration_id: OrchestrationId,
    title: String,
    summary: String,
    requirements: Vec<String>,
    task_ids: Vec<TaskId>,
}

impl CreatePlanRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(orchestration_id: OrchestrationId, title: impl Into<String>) -> Self {
        Self {
            orchestration_id,
            title: title.into(),
            summary: String::new(),
            requirements: Vec::new(),
            task_ids: Vec::new(),
        }
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Adds one requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Replaces the planned tasks.
    #[must_use]
    pub fn with_tasks(mut self, task_ids: impl IntoIterator<Item = TaskId>) -> Self {
        self.task_ids = task_ids.into_iter().collect();
        self
    }
}

/// Errors returned by the plan service.
#[derive(Debug, Error)]
pub enum PlanServiceError {
    /// Plan validation failed.
    #[error(transparent)]
    Domain(#[from] PlanDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] PlanRepositoryError),

    /// The plan does not exist.
    #[error("plan not found: {0}")]
    NotFound(PlanId),
}

impl PlanServiceError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(error) => error.kind(),
            Self::Repository(error) => error.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Result type for plan service operations.
pub type PlanServiceResult<T> = Result<T, PlanServiceError>;

/// Plan record service.
#[derive(Clone)]
pub struct PlanService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
}

impl<R, C> PlanService<R, C>
where
    R: PlanRepository,
    C: Clock + Send + Sync,
{
    /// Creates a plan service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates and persists a plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Domain`] for invalid input and
    /// [`PlanServiceError::Repository`] when persistence fails.
    pub async fn create_plan(&self, request: CreatePlanRequest) -> PlanServiceResult<Plan> {
        let plan = Plan::new(
            NewPlan {
                orchestration_id: request.orchestration_id,
                title: request.title,
                summary: request.summary,
                requirements: request.requirements,
                task_ids: request.task_ids,
            },
            &*self.clock,
        )?;
        self.repository.save(&plan).await?;
        debug!(plan_id = %plan.id(), orchestration_id = %plan.orchestration_id(), "plan created");
        Ok(plan)
    }

    /// Returns a plan by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Repository`] when the lookup fails.
    pub async fn get_plan(&self, plan_id: PlanId) -> PlanServiceResult<Option<Plan>> {
        Ok(self.repository.find_by_id(plan_id).await?)
    }

    /// Returns the plans of an orchestration, most recently changed first.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Repository`] when the lookup fails.
    pub async fn plans_for(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanServiceResult<Vec<Plan>> {
        let mut plans = self
            .repository
            .find_by_orchestration(orchestration_id)
            .await?;
        plans.sort_by(|left, right| {
            right
                .updated_at()
                .cmp(&left.updated_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Ok(plans)
    }

    /// Returns the most recently changed plan of an orchestration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Repository`] when the lookup fails.
    pub async fn current_plan(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanServiceResult<Option<Plan>> {
        Ok(self.plans_for(orchestration_id).await?.into_iter().next())
    }

    /// Appends tasks to a plan, skipping ones already listed.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::NotFound`] for an unknown plan and
    /// [`PlanServiceError::Repository`] when persistence fails.
    pub async fn attach_tasks(&self, plan_id: PlanId, task_ids: &[TaskId]) -> PlanServiceResult<Plan> {
        let mut plan = self.require(plan_id).await?;
        if plan.attach_tasks(task_ids, &*self.clock) > 0 {
            self.repository.save(&plan).await?;
        }
        Ok(plan)
    }

    /// Drops a task from a plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::NotFound`] for an unknown plan and
    /// [`PlanServiceError::Repository`] when persistence fails.
    pub async fn detach_task(&self, plan_id: PlanId, task_id: TaskId) -> PlanServiceResult<Plan> {
        let mut plan = self.require(plan_id).await?;
        if plan.detach_task(task_id, &*self.clock) {
            self.repository.save(&plan).await?;
        }
        Ok(plan)
    }

    /// Replaces the summary and requirements of a plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Domain`] for a blank requirement,
    /// [`PlanServiceError::NotFound`] for an unknown plan and
    /// [`PlanServiceError::Repository`] when persistence fails.
    pub async fn revise_plan(
        &self,
        plan_id: PlanId,
        summary: impl Into<String> + Send,
        requirements: Vec<String>,
    ) -> PlanServiceResult<Plan> {
        let mut plan = self.require(plan_id).await?;
        plan.revise(summary, requirements, &*self.clock)?;
        self.repository.save(&plan).await?;
        Ok(plan)
    }

    /// Removes every plan of an orchestration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanServiceError::Repository`] when the lookup fails.
    /// Individual removal failures are reported in the outcome.
    pub async fn reset_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanServiceResult<BulkOutcome> {
        let plans = self
            .repository
            .find_by_orchestration(orchestration_id)
            .await?;
        let mut outcome = BulkOutcome::default();
        for plan in plans {
            match self.repository.remove(plan.id()).await {
                Ok(removal) => outcome.record_removal(&removal),
                Err(error) => outcome.record_failure(plan.id().to_string(), &error),
            }
        }
        info!(
            orchestration_id = %orchestration_id,
            removed = outcome.removed,
            backed_up = outcome.backed_up,
            failed = outcome.failed,
            "orchestration plans reset"
        );
        Ok(outcome)
    }

    async fn require(&self, plan_id: PlanId) -> PlanServiceResult<Plan> {
        self.repository
            .find_by_id(plan_id)
            .await?
            .ok_or(PlanServiceError::NotFound(plan_id))
    }
}
