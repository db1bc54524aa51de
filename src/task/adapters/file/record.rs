//! Storage binding of the task aggregate.

use crate::OrchestrationId;
use crate::store::{Record, RecordKind, Salvage};
use crate::task::domain::{
    Dependency, Estimation, PersistedTaskData, Task, TaskId, TaskProgress, TaskStatus,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

const RECOVERED_NAME: &str = "Recovered task";

impl Record for Task {
    const KIND: RecordKind = RecordKind::Task;

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

    /// Rebuilds a `not_started` task keeping whatever identity, naming and
    /// structure survived.
    fn reconstruct(id_hint: &str, salvage: &Salvage, now: DateTime<Utc>) -> Self {
        let id = id_hint
            .parse::<TaskId>()
            .ok()
            .or_else(|| salvage.uuid("id").map(TaskId::from_uuid))
            .unwrap_or_default();
        let created_at = salvage.timestamp("createdAt").unwrap_or(now);
        Self::from_persisted(PersistedTaskData {
            id,
            orchestration_id: salvage
                .string("orchestrationId")
                .and_then(|raw| OrchestrationId::new(raw).ok())
                .unwrap_or_else(OrchestrationId::recovered),
            name: salvage.string("name").unwrap_or(RECOVERED_NAME).to_owned(),
            description: salvage.string("description").unwrap_or_default().to_owned(),
            status: TaskStatus::NotStarted,
            priority: salvage.parse("priority").unwrap_or_default(),
            progress: TaskProgress {
                completion_percentage: 0,
                updated_at: now,
            },
            acceptance_criteria: salvage.parse("acceptanceCriteria").unwrap_or_default(),
            estimation: salvage
                .parse::<Estimation>("estimation")
                .filter(Estimation::is_valid),
            dependencies: salvaged_dependencies(id, salvage),
            parent_task_id: salvage.uuid("parentTaskId").map(TaskId::from_uuid),
            child_task_ids: salvage.parse("childTaskIds").unwrap_or_default(),
            session_id: None,
            created_at,
            started_at: None,
            completed_at: None,
            updated_at: now,
        })
    }
}

fn salvaged_dependencies(id: TaskId, salvage: &Salvage) -> Vec<Dependency> {
    let mut seen = HashSet::new();
    salvage
        .parse::<Vec<Dependency>>("dependencies")
        .unwrap_or_default()
        .into_iter()
        .filter(|dependency| dependency.task_id != id && seen.insert(dependency.task_id))
        .collect()
}
