//! Task repository backed by the persistent record store.

use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

use crate::OrchestrationId;
use crate::store::{RecordQuery, RecordStore, RemovalOutcome, StoreConfig, StoreResult};
use crate::task::{
    domain::{Task, TaskId},
    ports::{TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Durable task repository writing `<data_dir>/tasks/<task-id>.json`.
pub struct FileTaskRepository {
    records: RecordStore<Task>,
}

impl FileTaskRepository {
    /// Opens the task directory described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a store error when the directory cannot be created.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            records: RecordStore::open(config).await?,
        })
    }

    /// Opens the task directory, stamping backups and reconstructed
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
    pub const fn records(&self) -> &RecordStore<Task> {
        &self.records
    }
}

#[async_trait]
impl TaskRepository for FileTaskRepository {
    async fn store(&self, task: &Task) -> TaskRepositoryResult<()> {
        let id = task.id().to_string();
        if self.records.exists(&id).await? {
            return Err(TaskRepositoryError::DuplicateTask(task.id()));
        }
        self.records.save(task).await?;
        Ok(())
    }

    async fn update(&self, task: &Task) -> TaskRepositoryResult<()> {
        let id = task.id().to_string();
        if !self.records.exists(&id).await? {
            return Err(TaskRepositoryError::NotFound(task.id()));
        }
        self.records.save(task).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        Ok(self.records.load(&id.to_string()).await?)
    }

    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let query = RecordQuery::for_orchestration(orchestration_id.clone());
        Ok(self.records.query(&query, |_| true).await?)
    }

    async fn remove(&self, id: TaskId) -> TaskRepositoryResult<RemovalOutcome> {
        Ok(self.records.delete(&id.to_string()).await?)
    }
}
