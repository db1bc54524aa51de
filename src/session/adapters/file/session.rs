//! Session repository backed by the persistent record store.

use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

use super::digest::SessionDigest;
use crate::OrchestrationId;
use crate::session::{
    domain::{Session, SessionId, SessionSummary},
    ports::{SessionRepository, SessionRepositoryError, SessionRepositoryResult},
};
use crate::store::{RecordQuery, RecordStore, RemovalOutcome, StoreConfig, StoreResult};

/// Durable session repository writing `<data_dir>/sessions/<session-id>.json`.
pub struct FileSessionRepository {
    records: RecordStore<Session>,
}

impl FileSessionRepository {
    /// Opens the session directory described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a store error when the directory cannot be created.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        Ok(Self {
            records: RecordStore::open(config).await?,
        })
    }

    /// Opens the session directory, stamping backups and reconstructed
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
    pub const fn records(&self) -> &RecordStore<Session> {
        &self.records
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn store(&self, session: &Session) -> SessionRepositoryResult<()> {
        if self.records.exists(&session.id().to_string()).await? {
            return Err(SessionRepositoryError::DuplicateSession(session.id()));
        }
        self.records.save(session).await?;
        Ok(())
    }

    async fn update(&self, session: &Session) -> SessionRepositoryResult<()> {
        if !self.records.exists(&session.id().to_string()).await? {
            return Err(SessionRepositoryError::NotFound(session.id()));
        }
        self.records.save(session).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> SessionRepositoryResult<Option<Session>> {
        Ok(self.records.load(&id.to_string()).await?)
    }

    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionRepositoryResult<Vec<Session>> {
        let query = RecordQuery::for_orchestration(orchestration_id.clone());
        Ok(self.records.query(&query, |_| true).await?)
    }

    async fn list_all(&self) -> SessionRepositoryResult<Vec<Session>> {
        Ok(self.records.query(&RecordQuery::new(), |_| true).await?)
    }

    async fn remove(&self, id: SessionId) -> SessionRepositoryResult<RemovalOutcome> {
        Ok(self.records.delete(&id.to_string()).await?)
    }

    async fn find_summary(&self, id: SessionId) -> SessionRepositoryResult<Option<SessionSummary>> {
        let digest = self
            .records
            .load_as::<SessionDigest>(&id.to_string())
            .await?;
        Ok(digest.map(SessionSummary::from))
    }
}
