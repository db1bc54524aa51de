//! Storage binding of the plan aggregate.

use crate::OrchestrationId;
use crate::plan::domain::{PersistedPlanData, Plan, PlanId};
use crate::store::{Record, RecordKind, Salvage};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

const RECOVERED_TITLE: &str = "Recovered plan";

impl Record for Plan {
    const KIND: RecordKind = RecordKind::Plan;

    fn record_id(&self) -> String {
        self.id().to_string()
    }

    fn orchestration_id(&self) -> &OrchestrationId {
        Self::orchestration_id(self)
    }

    fn sort_timestamp(&self) -> DateTime<Utc> {
        self.updated_at()
    }

    fn validate(&self) -> Vec<String> {
        self.shape_violations()
    }

    /// Keeps the identity, wording and task order that survived; blank
    /// requirements and repeated tasks are dropped.
    fn reconstruct(id_hint: &str, salvage: &Salvage, now: DateTime<Utc>) -> Self {
        let id = id_hint
            .parse::<PlanId>()
            .ok()
            .or_else(|| salvage.uuid("id").map(PlanId::from_uuid))
            .unwrap_or_default();
        let title = salvage
            .string("title")
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(RECOVERED_TITLE);
        let mut seen = HashSet::new();
        let task_ids = salvage
            .parse::<Vec<TaskId>>("taskIds")
            .unwrap_or_default()
            .into_iter()
            .filter(|task_id| seen.insert(*task_id))
            .collect();
        let requirements = salvage
            .parse::<Vec<String>>("requirements")
            .unwrap_or_default()
            .into_iter()
            .filter(|requirement| !requirement.trim().is_empty())
            .collect();
        Self::from_persisted(PersistedPlanData {
            id,
            orchestration_id: salvage
                .string("orchestrationId")
                .and_then(|raw| OrchestrationId::new(raw).ok())
                .unwrap_or_else(OrchestrationId::recovered),
            title: title.to_owned(),
            summary: salvage.string("summary").unwrap_or_default().to_owned(),
            requirements,
            task_ids,
            created_at: salvage
                .timestamp("createdAt")
                .filter(|created| *created <= now)
                .unwrap_or(now),
            updated_at: now,
        })
    }
}
