//! Unit tests for the session hierarchy.
//!
//! Tests are organised by concern: the state machine, context and thinking
//! rules, the hierarchy index, the service over the in-memory adapter and
//! the file adapter.

mod context_tests;
mod file_adapter_tests;
mod navigation_tests;

use crate::OrchestrationId;
use crate::session::domain::{
    PersistedSessionData, Session, SessionContext, SessionId, SessionMetadata, SessionState,
    SessionType,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub(super) fn orchestration(raw: &str) -> OrchestrationId {
    OrchestrationId::new(raw).expect("orchestration identifier should be valid")
}

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("fixed timestamp is valid")
}

/// Shape of a session built directly from persisted data.
pub(super) struct Seed {
    pub(super) id: SessionId,
    pub(super) position: i64,
    pub(super) state: SessionState,
    pub(super) parent: Option<SessionId>,
    pub(super) children: Vec<SessionId>,
}

impl Seed {
    pub(super) fn new(position: i64) -> Self {
        Self {
            id: SessionId::new(),
            position,
            state: SessionState::Active,
            parent: None,
            children: Vec::new(),
        }
    }

    pub(super) const fn in_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    pub(super) const fn under(mut self, parent: SessionId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub(super) fn listing(mut self, children: &[SessionId]) -> Self {
        self.children = children.to_vec();
        self
    }

    /// Builds the session, bypassing the hierarchy service so tests can
    /// shape drifted listings. `position` orders creation timestamps; a
    /// finished session completes one minute after it started.
    pub(super) fn build(self, orchestration_id: &OrchestrationId) -> Session {
        let created_at = base_time() + Duration::minutes(self.position);
        let completed_at = self
            .state
            .is_finished()
            .then(|| created_at + Duration::minutes(1));
        Session::from_persisted(PersistedSessionData {
            id: self.id,
            orchestration_id: orchestration_id.clone(),
            task_id: None,
            session_type: SessionType::Task,
            state: self.state,
            context: SessionContext::default(),
            metadata: SessionMetadata::named(format!("session {}", self.position)),
            parent_session_id: self.parent,
            child_session_ids: self.children,
            created_at,
            last_activity_at: completed_at.unwrap_or(created_at),
            completed_at,
            failure_reason: None,
        })
    }
}
