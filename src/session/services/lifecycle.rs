//! Service layer for creating sessions and driving their state machine.

use crate::OrchestrationId;
use crate::error::ErrorKind;
use crate::session::{
    domain::{
        NewSession, Session, SessionContext, SessionDomainError, SessionId, SessionMetadata,
        SessionState, SessionType,
    },
    ports::{SessionRepository, SessionRepositoryError},
};
use crate::task::domain::TaskId;
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Request payload for creating a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionRequest {
    orchestration_id: OrchestrationId,
    session_type: SessionType,
    task_id: Option<TaskId>,
    parent_session_id: Option<SessionId>,
    metadata: SessionMetadata,
    context: SessionContext,
}

impl CreateSessionRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(orchestration_id: OrchestrationId, session_type: SessionType) -> Self {
        Self {
            orchestration_id,
            session_type,
            task_id: None,
            parent_session_id: None,
            metadata: SessionMetadata::default(),
            context: SessionContext::default(),
        }
    }

    /// Links the task the session works on.
    #[must_use]
    pub const fn with_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Nests the session under `parent_session_id`.
    #[must_use]
    pub const fn with_parent(mut self, parent_session_id: SessionId) -> Self {
        self.parent_session_id = Some(parent_session_id);
        self
    }

    /// Sets the descriptive fields.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    /// Seeds the working context.
    #[must_use]
    pub fn with_context(mut self, context: SessionContext) -> Self {
        self.context = context;
        self
    }
}

/// Service-level errors for session operations.
#[derive(Debug, Error)]
pub enum SessionServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] SessionDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] SessionRepositoryError),
    /// The addressed session does not exist.
    #[error("session not found: {0}")]
    NotFound(SessionId),
    /// The parent belongs to another orchestration.
    #[error(
        "parent session {parent_session_id} belongs to orchestration {parent_orchestration}, not {requested}"
    )]
    CrossOrchestrationParent {
        /// Requested parent.
        parent_session_id: SessionId,
        /// Orchestration of the parent.
        parent_orchestration: OrchestrationId,
        /// Orchestration of the new session.
        requested: OrchestrationId,
    },
    /// The child was written but the parent listing was not.
    ///
    /// `compensated` reports whether the child was removed again.
    #[error("session {child} not linked to parent {parent} (child removed: {compensated}): {source}")]
    ParentLinkFailed {
        /// New session.
        child: SessionId,
        /// Parent whose listing failed to update.
        parent: SessionId,
        /// Whether the child write was undone.
        compensated: bool,
        /// Failure of the parent write.
        #[source]
        source: Box<SessionRepositoryError>,
    },
}

impl SessionServiceError {
    /// Classifies the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(error) => error.kind(),
            Self::Repository(error) => error.kind(),
            Self::ParentLinkFailed { source, .. } => source.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::CrossOrchestrationParent { .. } => ErrorKind::ValidationFailed,
        }
    }
}

/// Result type for session service operations.
pub type SessionServiceResult<T> = Result<T, SessionServiceError>;

/// Session hierarchy and state machine service.
#[derive(Clone)]
pub struct SessionService<R, C>
where
    R: SessionRepository,
    C: Clock + Send + Sync,
{
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<C>,
}

impl<R, C> SessionService<R, C>
where
    R: SessionRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new session service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    /// Creates an `active` session.
    ///
    /// With a parent, the child is written first and then appended to the
    /// parent's listing. When the parent write fails the child is removed
    /// again; a failed removal leaves an orphan that
    /// [`SessionService::reconcile_hierarchy`] repairs.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown parent,
    /// [`SessionServiceError::CrossOrchestrationParent`] when the parent
    /// belongs elsewhere, [`SessionServiceError::ParentLinkFailed`] when the
    /// parent write fails and [`SessionServiceError::Repository`] for other
    /// persistence failures.
    pub async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> SessionServiceResult<Session> {
        let mut parent = None;
        if let Some(parent_session_id) = request.parent_session_id {
            parent = Some(
                self.parent_for(parent_session_id, &request.orchestration_id)
                    .await?,
            );
        }

        let session = Session::new(
            NewSession {
                orchestration_id: request.orchestration_id,
                session_type: request.session_type,
                task_id: request.task_id,
                parent_session_id: request.parent_session_id,
                metadata: request.metadata,
                context: request.context,
            },
            &*self.clock,
        );
        self.repository.store(&session).await?;
        debug!(session_id = %session.id(), session_type = %session.session_type(), "session created");

        if let Some(mut parent) = parent {
            parent.add_child(session.id(), &*self.clock)?;
            if let Err(source) = self.repository.update(&parent).await {
                return Err(self.compensate(session.id(), parent.id(), source).await);
            }
        }
        Ok(session)
    }

    async fn parent_for(
        &self,
        parent_session_id: SessionId,
        orchestration_id: &OrchestrationId,
    ) -> SessionServiceResult<Session> {
        let parent = self.require(parent_session_id).await?;
        if parent.orchestration_id() != orchestration_id {
            return Err(SessionServiceError::CrossOrchestrationParent {
                parent_session_id,
                parent_orchestration: parent.orchestration_id().clone(),
                requested: orchestration_id.clone(),
            });
        }
        Ok(parent)
    }

    async fn compensate(
        &self,
        child: SessionId,
        parent: SessionId,
        source: SessionRepositoryError,
    ) -> SessionServiceError {
        let compensated = match self.repository.remove(child).await {
            Ok(_) => true,
            Err(error) => {
                warn!(
                    session_id = %child,
                    parent_session_id = %parent,
                    %error,
                    "orphaned child session left behind after failed parent update"
                );
                false
            }
        };
        SessionServiceError::ParentLinkFailed {
            child,
            parent,
            compensated,
            source: Box::new(source),
        }
    }

    /// Returns a session by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the lookup fails.
    pub async fn get_session(&self, session_id: SessionId) -> SessionServiceResult<Option<Session>> {
        Ok(self.repository.find_by_id(session_id).await?)
    }

    pub(super) async fn require(&self, session_id: SessionId) -> SessionServiceResult<Session> {
        self.repository
            .find_by_id(session_id)
            .await?
            .ok_or(SessionServiceError::NotFound(session_id))
    }

    /// Loads a session, applies `change` and persists the result.
    ///
    /// Nothing is written when `change` fails.
    pub(super) async fn mutate<T>(
        &self,
        session_id: SessionId,
        change: impl FnOnce(&mut Session, &C) -> Result<T, SessionDomainError>,
    ) -> SessionServiceResult<(Session, T)> {
        let mut session = self.require(session_id).await?;
        let value = change(&mut session, &*self.clock)?;
        self.repository.update(&session).await?;
        Ok((session, value))
    }

    /// Moves a session to `state`.
    ///
    /// Same-state requests only refresh `last_activity_at`. `reason` is
    /// recorded when the session fails.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Domain`] when the transition is not permitted.
    pub async fn update_state(
        &self,
        session_id: SessionId,
        state: SessionState,
        reason: Option<String>,
    ) -> SessionServiceResult<Session> {
        let (session, changed) = self
            .mutate(session_id, |session, clock| {
                session.update_state(state, reason, clock)
            })
            .await?;
        if changed {
            debug!(session_id = %session_id, state = %state, "session state changed");
        }
        Ok(session)
    }

    /// Returns the sessions of an orchestration, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the lookup fails.
    pub async fn list_sessions(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionServiceResult<Vec<Session>> {
        let mut sessions = self
            .repository
            .find_by_orchestration(orchestration_id)
            .await?;
        sessions.sort_by_key(|session| (session.created_at(), session.id()));
        Ok(sessions)
    }

    /// Returns the sessions linked to a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the lookup fails.
    pub async fn sessions_for_task(&self, task_id: TaskId) -> SessionServiceResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .repository
            .list_all()
            .await?
            .into_iter()
            .filter(|session| session.task_id() == Some(task_id))
            .collect();
        sessions.sort_by_key(|session| (session.created_at(), session.id()));
        Ok(sessions)
    }
}
