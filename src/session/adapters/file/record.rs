//! Storage binding of the session aggregate.

use crate::OrchestrationId;
use crate::session::domain::{
    PersistedSessionData, Session, SessionContext, SessionId, SessionState, SessionType,
};
use crate::store::{Record, RecordKind, Salvage};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

impl Record for Session {
    const KIND: RecordKind = RecordKind::Session;

    fn record_id(&self) -> String {
        self.id().to_string()
    }

    fn orchestration_id(&self) -> &OrchestrationId {
        Self::orchestration_id(self)
    }

    fn sort_timestamp(&self) -> DateTime<Utc> {
        self.last_activity_at()
    }

    fn validate(&self) -> Vec<String> {
        self.shape_violations()
    }

    /// Rebuilds a `suspended` session with an empty context, keeping the
    /// identity, links and descriptive fields that survived.
    fn reconstruct(id_hint: &str, salvage: &Salvage, now: DateTime<Utc>) -> Self {
        let id = id_hint
            .parse::<SessionId>()
            .ok()
            .or_else(|| salvage.uuid("id").map(SessionId::from_uuid))
            .unwrap_or_default();
        let session_type = salvage
            .string("type")
            .and_then(|raw| SessionType::try_from(raw).ok())
            .unwrap_or(SessionType::Interactive);
        Self::from_persisted(PersistedSessionData {
            id,
            orchestration_id: salvage
                .string("orchestrationId")
                .and_then(|raw| OrchestrationId::new(raw).ok())
                .unwrap_or_else(OrchestrationId::recovered),
            task_id: salvage.uuid("taskId").map(TaskId::from_uuid),
            session_type,
            state: SessionState::Suspended,
            context: SessionContext::default(),
            metadata: salvage.parse("metadata").unwrap_or_default(),
            parent_session_id: salvage
                .uuid("parentSessionId")
                .map(SessionId::from_uuid)
                .filter(|parent| *parent != id),
            child_session_ids: salvaged_children(id, salvage),
            created_at: salvage.timestamp("createdAt").unwrap_or(now),
            last_activity_at: now,
            completed_at: None,
            failure_reason: None,
        })
    }
}

fn salvaged_children(id: SessionId, salvage: &Salvage) -> Vec<SessionId> {
    let mut seen = HashSet::new();
    salvage
        .parse::<Vec<SessionId>>("childSessionIds")
        .unwrap_or_default()
        .into_iter()
        .filter(|child| *child != id && seen.insert(*child))
        .collect()
}
