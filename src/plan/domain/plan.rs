//! Plan aggregate.

use super::{PlanDomainError, PlanId};
use crate::OrchestrationId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Parameter object for creating a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    /// Owning orchestration.
    pub orchestration_id: OrchestrationId,
    /// Plan title.
    pub title: String,
    /// Free-form summary.
    pub summary: String,
    /// Requirements the plan addresses.
    pub requirements: Vec<String>,
    /// Tasks produced, in planned order.
    pub task_ids: Vec<TaskId>,
}

/// Output of the planning phase for one orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    id: PlanId,
    orchestration_id: OrchestrationId,
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    task_ids: Vec<TaskId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPlanData {
    /// Persisted identifier.
    pub id: PlanId,
    /// Persisted orchestration.
    pub orchestration_id: OrchestrationId,
    /// Persisted title.
    pub title: String,
    /// Persisted summary.
    pub summary: String,
    /// Persisted requirements.
    pub requirements: Vec<String>,
    /// Persisted task order.
    pub task_ids: Vec<TaskId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest change timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Creates a plan.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError`] when the title or a requirement is blank,
    /// or a task is listed twice.
    pub fn new(request: NewPlan, clock: &impl Clock) -> Result<Self, PlanDomainError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(PlanDomainError::EmptyTitle);
        }
        let requirements = trimmed_requirements(request.requirements)?;
        let mut seen = HashSet::new();
        if let Some(duplicate) = request.task_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(PlanDomainError::DuplicateTask(*duplicate));
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: PlanId::new(),
            orchestration_id: request.orchestration_id,
            title: title.to_owned(),
            summary: request.summary,
            requirements,
            task_ids: request.task_ids,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Rebuilds a plan from persisted data without validation.
    #[must_use]
    pub fn from_persisted(data: PersistedPlanData) -> Self {
        Self {
            id: data.id,
            orchestration_id: data.orchestration_id,
            title: data.title,
            summary: data.summary,
            requirements: data.requirements,
            task_ids: data.task_ids,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> PlanId {
        self.id
    }

    /// Returns the owning orchestration.
    #[must_use]
    pub const fn orchestration_id(&self) -> &OrchestrationId {
        &self.orchestration_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the summary.
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Returns the requirements.
    #[must_use]
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    /// Returns the planned tasks in order.
    #[must_use]
    pub fn task_ids(&self) -> &[TaskId] {
        &self.task_ids
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Appends tasks not yet in the plan, keeping their order, and returns
    /// how many were added.
    pub fn attach_tasks(&mut self, task_ids: &[TaskId], clock: &impl Clock) -> usize {
        let mut seen: HashSet<TaskId> = self.task_ids.iter().copied().collect();
        let before = self.task_ids.len();
        self.task_ids
            .extend(task_ids.iter().copied().filter(|id| seen.insert(*id)));
        let added = self.task_ids.len() - before;
        if added > 0 {
            self.updated_at = clock.utc();
        }
        added
    }

    /// Drops a task from the plan, returning whether it was listed.
    pub fn detach_task(&mut self, task_id: TaskId, clock: &impl Clock) -> bool {
        let before = self.task_ids.len();
        self.task_ids.retain(|id| *id != task_id);
        let removed = self.task_ids.len() != before;
        if removed {
            self.updated_at = clock.utc();
        }
        removed
    }

    /// Replaces the summary and requirements.
    ///
    /// # Errors
    ///
    /// Returns [`PlanDomainError::EmptyRequirement`] when a requirement is
    /// blank; the plan is left unchanged.
    pub fn revise(
        &mut self,
        summary: impl Into<String>,
        requirements: Vec<String>,
        clock: &impl Clock,
    ) -> Result<(), PlanDomainError> {
        self.requirements = trimmed_requirements(requirements)?;
        self.summary = summary.into();
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Lists structural problems that would make the record invalid.
    #[must_use]
    pub fn shape_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.orchestration_id.is_blank() {
            violations.push("orchestrationId must not be empty".to_owned());
        }
        if self.title.trim().is_empty() {
            violations.push("title must not be empty".to_owned());
        }
        if self.updated_at < self.created_at {
            violations.push("updatedAt precedes createdAt".to_owned());
        }
        let mut seen = HashSet::new();
        for id in &self.task_ids {
            if !seen.insert(*id) {
                violations.push(format!("task {id} is listed more than once"));
            }
        }
        violations
    }
}

fn trimmed_requirements(requirements: Vec<String>) -> Result<Vec<String>, PlanDomainError> {
    requirements
        .into_iter()
        .map(|requirement| {
            let trimmed = requirement.trim();
            if trimmed.is_empty() {
                Err(PlanDomainError::EmptyRequirement)
            } else {
                Ok(trimmed.to_owned())
            }
        })
        .collect()
}
