//! Partial view of a session document used to build summaries.
//!
//! Message bodies and artifact contents are skipped while parsing, so a
//! summary of a long-running session does not materialize its log.

use crate::session::domain::{
    Decision, SessionId, SessionState, SessionSummary, SessionType, recent_decisions,
};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::de::{Deserializer, IgnoredAny, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionDigest {
    id: SessionId,
    #[serde(rename = "type")]
    session_type: SessionType,
    state: SessionState,
    #[serde(default)]
    task_id: Option<TaskId>,
    #[serde(default)]
    context: ContextDigest,
    last_activity_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextDigest {
    #[serde(default, deserialize_with = "count_entries")]
    messages: usize,
    #[serde(default)]
    artifacts: Vec<ArtifactName>,
    #[serde(default)]
    decisions: Vec<Decision>,
    #[serde(default)]
    current_focus: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtifactName {
    name: String,
}

impl From<SessionDigest> for SessionSummary {
    fn from(digest: SessionDigest) -> Self {
        let context = digest.context;
        Self {
            id: digest.id,
            session_type: digest.session_type,
            state: digest.state,
            task_id: digest.task_id,
            current_focus: context.current_focus,
            recent_decisions: recent_decisions(&context.decisions),
            artifact_count: context.artifacts.len(),
            artifact_names: context
                .artifacts
                .into_iter()
                .map(|artifact| artifact.name)
                .collect(),
            message_count: context.messages,
            decision_count: context.decisions.len(),
            last_activity_at: digest.last_activity_at,
        }
    }
}

struct EntryCounter;

impl<'de> Visitor<'de> for EntryCounter {
    type Value = usize;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut count = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

fn count_entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    deserializer.deserialize_seq(EntryCounter)
}
