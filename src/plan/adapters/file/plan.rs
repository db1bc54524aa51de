//! Plan repository backed by the persistent record store.

use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

use crate::OrchestrationId;
use crate::plan::{
    domain::{Plan, PlanId},
    ports::{PlanRepository, PlanRepositoryResult},
};
use crate::store::{RecordQuery, RecordStore, RemovalOutcome, StoreConfig, StoreResult};

/// Durable plan repository writing `<data_dir>/plans/<plan-id>.json`.
pub struct FilePlanRepository {
    records: RecordStore<Plan>,
}

impl FilePlanRepository {
    /// Opens the plan directory described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a store error when the directory cannot be created.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            records: RecordStore::open(config).await?,
        })
    }

    /// Opens the plan directory, stamping backups and reconstructed
    /// records with `clock`.
    ///
    /// # Errors
    ///
    /// Returns a store error when the directory cannot be created.
    pub async fn open_with_clock(
        config: &StoreConfig,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> StoreResult<Self> {
        Ok(Self {
            records: RecordStore::open_with_clock(config, clock).await?,
        })
    }

    /// Returns the underlying record store for recovery and backup
    /// operations.
    #[must_use]
    pub const fn records(&self) -> &RecordStore<Plan> {
        &self.records
    }
}

#[async_trait]
impl PlanRepository for FilePlanRepository {
    async fn save(&self, plan: &Plan) -> PlanRepositoryResult<()> {
        self.records.save(plan).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: PlanId) -> PlanRepositoryResult<Option<Plan>> {
        Ok(self.records.load(&id.to_string()).await?)
    }

    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> PlanRepositoryResult<Vec<Plan>> {
        let query = RecordQuery::for_orchestration(orchestration_id.clone());
        Ok(self.records.query(&query, |_| true).await?)
    }

    async fn remove(&self, id: PlanId) -> PlanRepositoryResult<RemovalOutcome> {
        Ok(self.records.delete(&id.to_string()).await?)
    }
}
