//! Aggregate figures over the tasks of one orchestration.

use super::{Task, TaskPriority, TaskStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and totals consumed by reporting layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    /// Number of tasks.
    pub total: usize,
    /// Tasks per status; every status is present.
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Tasks per priority; every priority is present.
    pub by_priority: BTreeMap<TaskPriority, usize>,
    /// Mean completion percentage, 0 without tasks.
    pub average_completion: u8,
    /// Sum of estimated effort over estimated tasks.
    pub estimated_hours: f64,
    /// Acceptance criteria marked met.
    pub criteria_met: usize,
    /// Acceptance criteria overall.
    pub criteria_total: usize,
}

impl TaskStatistics {
    /// Computes the statistics of `tasks`.
    #[must_use]
    #[expect(clippy::float_arithmetic, reason = "effort hours are fractional")]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut by_status: BTreeMap<TaskStatus, usize> =
            TaskStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        let mut by_priority: BTreeMap<TaskPriority, usize> = TaskPriority::ALL
            .into_iter()
            .map(|priority| (priority, 0))
            .collect();
        let mut completion_sum: usize = 0;
        let mut estimated_hours = 0.0;
        let mut criteria_met = 0;
        let mut criteria_total = 0;

        for task in tasks {
            *by_status.entry(task.status()).or_default() += 1;
            *by_priority.entry(task.priority()).or_default() += 1;
            completion_sum += usize::from(task.progress().completion_percentage);
            if let Some(estimation) = task.estimation() {
                estimated_hours += estimation.effort_hours;
            }
            criteria_total += task.acceptance_criteria().len();
            criteria_met += task
                .acceptance_criteria()
                .iter()
                .filter(|criterion| criterion.met)
                .count();
        }

        let average_completion = completion_sum
            .checked_div(tasks.len())
            .and_then(|mean| u8::try_from(mean).ok())
            .unwrap_or(0);

        Self {
            total: tasks.len(),
            by_status,
            by_priority,
            average_completion,
            estimated_hours,
            criteria_met,
            criteria_total,
        }
    }

    /// Returns the number of tasks in `status`.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}
