//! Repository port for session persistence.

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::session::domain::{Session, SessionId, SessionSummary};
use crate::store::{RemovalOutcome, StoreError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for session repository operations.
pub type SessionRepositoryResult<T> = Result<T, SessionRepositoryError>;

/// Session persistence contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionRepositoryError::DuplicateSession`] when the session
    /// ID already exists.
    async fn store(&self, session: &Session) -> SessionRepositoryResult<()>;

    /// Persists changes to an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionRepositoryError::NotFound`] when the session does not
    /// exist.
    async fn update(&self, session: &Session) -> SessionRepositoryResult<()>;

    /// Finds a session by identifier.
    async fn find_by_id(&self, id: SessionId) -> SessionRepositoryResult<Option<Session>>;

    /// Returns every session of the orchestration, in no particular order.
    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionRepositoryResult<Vec<Session>>;

    /// Returns every stored session, in no particular order.
    async fn list_all(&self) -> SessionRepositoryResult<Vec<Session>>;

    /// Removes a session. Adapters that keep backups take one first.
    async fn remove(&self, id: SessionId) -> SessionRepositoryResult<RemovalOutcome>;

    /// Summarizes a session.
    ///
    /// Adapters may override this to avoid loading the message log.
    async fn find_summary(&self, id: SessionId) -> SessionRepositoryResult<Option<SessionSummary>> {
        Ok(self
            .find_by_id(id)
            .await?
            .as_ref()
            .map(SessionSummary::from_session))
    }
}

/// Errors returned by session repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SessionRepositoryError {
    /// A session with the same identifier already exists.
    #[error("duplicate session identifier: {0}")]
    DuplicateSession(SessionId),

    /// The session was not found.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The persistent store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SessionRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateSession(_) => ErrorKind::ValidationFailed,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Store(error) => error.kind(),
            Self::Persistence(_) => ErrorKind::StorageFailure,
        }
    }
}
