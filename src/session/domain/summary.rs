//! Compact session views handed to context selection.

use super::{Decision, Session, SessionId, SessionState, SessionType};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of most recent decisions a summary carries.
pub const RECENT_DECISIONS: usize = 5;

/// What a related session contributes to another session's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Workflow phase.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Lifecycle state.
    pub state: SessionState,
    /// Linked task.
    pub task_id: Option<TaskId>,
    /// Current focus.
    pub current_focus: Option<String>,
    /// Up to five latest decisions, oldest first.
    pub recent_decisions: Vec<Decision>,
    /// Artifact names in creation order.
    pub artifact_names: Vec<String>,
    /// Number of logged messages.
    pub message_count: usize,
    /// Number of artifacts.
    pub artifact_count: usize,
    /// Number of decisions.
    pub decision_count: usize,
    /// Latest activity.
    pub last_activity_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Summarizes a fully loaded session.
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let context = session.context();
        Self {
            id: session.id(),
            session_type: session.session_type(),
            state: session.state(),
            task_id: session.task_id(),
            current_focus: context.current_focus.clone(),
            recent_decisions: recent_decisions(&context.decisions),
            artifact_names: context
                .artifacts
                .iter()
                .map(|artifact| artifact.name.clone())
                .collect(),
            message_count: context.messages.len(),
            artifact_count: context.artifacts.len(),
            decision_count: context.decisions.len(),
            last_activity_at: session.last_activity_at(),
        }
    }
}

/// Returns the latest [`RECENT_DECISIONS`] decisions, oldest first.
#[must_use]
pub fn recent_decisions(decisions: &[Decision]) -> Vec<Decision> {
    let skip = decisions.len().saturating_sub(RECENT_DECISIONS);
    decisions.iter().skip(skip).cloned().collect()
}
