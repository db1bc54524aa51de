//! Repository port for plan persistence.

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::plan::domain::{Plan, PlanId};
use crate::store::{RemovalOutcome, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for plan repository operations.
pub type PlanRepositoryResult<T> = Result<T, PlanRepositoryError>;

/// Plan persistence contract.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Writes a plan, replacing any earlier version.
    async fn save(&self, plan: &Plan) -> PlanRepositoryResult<()>;

    /// Finds a plan by identifier.
    ///
    /// Returns `None` when the plan does not exist.
    async fn find_by_id(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>>;

    /// Returns every plan of the orchestration, in no particular order.
    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanRepositoryResult<Vec<Plan>>;

    /// Removes a plan. Adapters that keep backups take one first.
    async fn remove(&self, id: PlanId) -> PlanRepositoryResult<RemovalOutcome>;
}

/// Errors returned by plan repository implementations.
#[derive(Debug, Clone, Error)]
pub enum PlanRepositoryError {
    /// The persistent store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl PlanRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(error) => error.kind(),
            Self::Persistence(_) => ErrorKind::StorageFailure,
        }
    }
}
