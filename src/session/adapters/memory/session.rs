//! In-memory repository for session service tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::OrchestrationId;
use crate::session::{
    domain::{Session, SessionId},
    ports::{SessionRepository, SessionRepositoryError, SessionRepositoryResult},
};
use crate::store::RemovalOutcome;

/// Thread-safe in-memory session repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    state: Arc<RwLock<HashMap<SessionId, Session>>>,
}

impl InMemorySessionRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> SessionRepositoryError {
    SessionRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn store(&self, session: &Session) -> SessionRepositoryResult<()> {
        let mut sessions = self.state.write().map_err(poisoned)?;
        if sessions.contains_key(&session.id()) {
            return Err(SessionRepositoryError::DuplicateSession(session.id()));
        }
        sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn update(&self, session: &Session) -> SessionRepositoryResult<()> {
        let mut sessions = self.state.write().map_err(poisoned)?;
        let slot = sessions
            .get_mut(&session.id())
            .ok_or(SessionRepositoryError::NotFound(session.id()))?;
        *slot = session.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> SessionRepositoryResult<Option<Session>> {
        let sessions = self.state.read().map_err(poisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    async fn find_by_orchestration(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionRepositoryResult<Vec<Session>> {
        let sessions = self.state.read().map_err(poisoned)?;
        Ok(sessions
            .values()
            .filter(|session| session.orchestration_id() == orchestration_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> SessionRepositoryResult<Vec<Session>> {
        let sessions = self.state.read().map_err(poisoned)?;
        Ok(sessions.values().cloned().collect())
    }

    async fn remove(&self, id: SessionId) -> SessionRepositoryResult<RemovalOutcome> {
        let mut sessions = self.state.write().map_err(poisoned)?;
        Ok(RemovalOutcome {
            existed: sessions.remove(&id).is_some(),
            backup: None,
        })
    }
}
