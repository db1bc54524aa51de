//! In-memory repository for plan tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::OrchestrationId;
use crate::plan::{
    domain::{Plan, PlanId},
    ports::{PlanRepository, PlanRepositoryError, PlanRepositoryResult},
};
use crate::store::RemovalOutcome;

/// Thread-safe in-memory plan repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanRepository {
    state: Arc<RwLock<HashMap<PlanId, Plan>>>,
}

impl InMemoryPlanRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> PlanRepositoryError {
    PlanRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn save(&self, plan: &Plan) -> PlanRepositoryResult<()> {
        let mut plans = self.state.write().map_err(poisoned)?;
        plans.insert(plan.id(), plan.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>> {
        let plans = self.state.read().map_err(poisoned)?;
        Ok(plans.get(&id).cloned())
    }

    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanRepositoryResult<Vec<Plan>> {
        let plans = self.state.read().map_err(poisoned)?;
        Ok(plans
            .values()
            .filter(|plan| plan.orchestration_id() == orchestration_id)
            .cloned()
            .collect())
    }

    async fn remove(&self, id: PlanId) -> PlanRepositoryResult<RemovalOutcome> {
        let mut plans = self.state.write().map_err(poisoned)?;
        Ok(RemovalOutcome {
            existed: plans.remove(&id).is_some(),
            backup: None,
        })
    }
}
