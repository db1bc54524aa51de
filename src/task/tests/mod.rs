//! Unit tests for the task graph.
//!
//! Tests are organised by concern: aggregate rules, the status table, graph
//! algorithms, the service over the in-memory adapter and the file adapter.

mod domain_tests;

use crate::OrchestrationId;
use crate::task::domain::{
    Dependency, PersistedTaskData, Task, TaskId, TaskPriority, TaskProgress, TaskStatus,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub(super) fn orchestration(raw: &str) -> OrchestrationId {
    OrchestrationId::new(raw).expect("orchestration identifier should be valid")
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("fixed timestamp is valid")
}

/// Builds a task directly, bypassing creation rules, so tests can shape
/// graphs the service would refuse (cycles, dangling edges).
///
/// `position` orders creation timestamps.
pub(super) fn persisted_task(
    id: TaskId,
    orchestration_id: &OrchestrationId,
    position: i64,
    dependencies: Vec<Dependency>,
) -> Task {
    let created_at = base_time() + Duration::minutes(position);
    Task::from_persisted(PersistedTaskData {
        id,
        orchestration_id: orchestration_id.clone(),
        name: format!("task {position}"),
        description: String::new(),
        status: TaskStatus::NotStarted,
        priority: TaskPriority::Medium,
        progress: TaskProgress {
            completion_percentage: 0,
            updated_at: created_at,
        },
        acceptance_criteria: Vec::new(),
        estimation: None,
        dependencies,
        parent_task_id: None,
        child_task_ids: Vec::new(),
        session_id: None,
        created_at,
        started_at: None,
        completed_at: None,
        updated_at: created_at,
    })
}
