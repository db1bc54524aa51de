//! Domain-focused tests for the task aggregate and dependency rules.

use super::{orchestration, persisted_task};
use crate::ErrorKind;
use crate::session::domain::SessionId;
use crate::task::domain::{
    Dependency, DependencyCheck, DependencyType, Estimation, NewTask, Task, TaskDomainError,
    TaskId, TaskPriority, TaskStatistics, TaskStatus,
};
use crate::test_support::StepClock;
use eyre::{bail, ensure};
use rstest::{fixture, rstest};

#[fixture]
fn clock() -> StepClock {
    StepClock::new()
}

fn new_task(name: &str) -> NewTask {
    NewTask {
        orchestration_id: orchestration("orch-domain"),
        name: name.to_owned(),
        description: String::new(),
        priority: TaskPriority::Medium,
        acceptance_criteria: Vec::new(),
        estimation: None,
        dependencies: Vec::new(),
        parent_task_id: None,
    }
}

#[rstest]
fn new_task_starts_not_started_with_unmet_criteria(clock: StepClock) -> eyre::Result<()> {
    let task = Task::new(
        NewTask {
            acceptance_criteria: vec!["parses input".to_owned(), "reports errors".to_owned()],
            ..new_task("  Build parser  ")
        },
        &clock,
    )?;

    ensure!(task.name() == "Build parser");
    ensure!(task.status() == TaskStatus::NotStarted);
    ensure!(task.progress().completion_percentage == 0);
    ensure!(task.acceptance_criteria().len() == 2);
    ensure!(task.acceptance_criteria().iter().all(|criterion| !criterion.met));
    ensure!(task.created_at() == task.updated_at());
    ensure!(task.started_at().is_none());
    Ok(())
}

#[rstest]
fn new_task_rejects_blank_name(clock: StepClock) {
    let result = Task::new(new_task("   "), &clock);
    assert_eq!(result, Err(TaskDomainError::EmptyName));
}

#[rstest]
#[case(-1.0, 0.5)]
#[case(4.0, 1.5)]
#[case(f64::NAN, 0.5)]
fn estimation_rejects_out_of_range_values(#[case] effort_hours: f64, #[case] confidence: f64) {
    let result = Estimation::new(effort_hours, confidence);
    assert!(matches!(result, Err(TaskDomainError::InvalidEstimation { .. })));
}

#[rstest]
fn new_task_rejects_repeated_prerequisite(clock: StepClock) {
    let prerequisite = TaskId::new();
    let result = Task::new(
        NewTask {
            dependencies: vec![
                Dependency::finish_to_start(prerequisite),
                Dependency::new(prerequisite, DependencyType::StartToStart),
            ],
            ..new_task("Twice")
        },
        &clock,
    );
    assert!(matches!(
        result,
        Err(TaskDomainError::DuplicateDependency { depends_on, .. }) if depends_on == prerequisite
    ));
}

#[rstest]
fn set_progress_rejects_values_above_one_hundred(clock: StepClock) -> eyre::Result<()> {
    let mut task = Task::new(new_task("Progress"), &clock)?;
    let Err(error) = task.set_progress(101, &clock) else {
        bail!("progress above 100 should be rejected");
    };
    ensure!(error == TaskDomainError::InvalidProgress(101));
    ensure!(error.kind() == ErrorKind::ValidationFailed);

    task.set_progress(40, &clock)?;
    ensure!(task.progress().completion_percentage == 40);
    ensure!(task.progress().updated_at == task.updated_at());
    Ok(())
}

#[rstest]
fn criterion_flags_are_index_checked(clock: StepClock) -> eyre::Result<()> {
    let mut task = Task::new(
        NewTask {
            acceptance_criteria: vec!["documented".to_owned()],
            ..new_task("Criteria")
        },
        &clock,
    )?;

    task.set_criterion_met(0, true, &clock)?;
    ensure!(task.acceptance_criteria().iter().all(|criterion| criterion.met));

    let Err(error) = task.set_criterion_met(3, true, &clock) else {
        bail!("unknown criterion index should be rejected");
    };
    ensure!(matches!(
        error,
        TaskDomainError::CriterionOutOfRange { index: 3, len: 1, .. }
    ));
    Ok(())
}

#[rstest]
fn add_dependency_rejects_self_and_duplicates(clock: StepClock) -> eyre::Result<()> {
    let mut task = Task::new(new_task("Edges"), &clock)?;
    let prerequisite = TaskId::new();

    let self_edge = task.add_dependency(Dependency::finish_to_start(task.id()), &clock);
    ensure!(self_edge == Err(TaskDomainError::SelfDependency(task.id())));

    task.add_dependency(Dependency::finish_to_start(prerequisite), &clock)?;
    ensure!(task.depends_on(prerequisite));

    let repeated = task.add_dependency(Dependency::finish_to_start(prerequisite), &clock);
    ensure!(matches!(
        repeated,
        Err(TaskDomainError::DuplicateDependency { .. })
    ));
    ensure!(task.dependencies().len() == 1);
    Ok(())
}

#[rstest]
fn session_link_can_be_set_and_cleared(clock: StepClock) -> eyre::Result<()> {
    let mut task = Task::new(new_task("Linked"), &clock)?;
    let session_id = SessionId::new();

    task.assign_session(Some(session_id), &clock);
    ensure!(task.session_id() == Some(session_id));

    task.assign_session(None, &clock);
    ensure!(task.session_id().is_none());
    Ok(())
}

#[rstest]
fn shape_violations_flag_damaged_records() {
    let id = TaskId::new();
    let damaged = persisted_task(
        id,
        &orchestration("orch-domain"),
        0,
        vec![Dependency::finish_to_start(id)],
    );
    let violations = damaged.shape_violations();
    assert_eq!(violations, vec!["task depends on itself".to_owned()]);
}

#[rstest]
#[case(DependencyType::FinishToStart, TaskStatus::InProgress, false)]
#[case(DependencyType::FinishToStart, TaskStatus::Completed, true)]
#[case(DependencyType::FinishToFinish, TaskStatus::InProgress, false)]
#[case(DependencyType::FinishToFinish, TaskStatus::Completed, true)]
#[case(DependencyType::StartToStart, TaskStatus::NotStarted, false)]
#[case(DependencyType::StartToStart, TaskStatus::InProgress, true)]
#[case(DependencyType::StartToStart, TaskStatus::Completed, true)]
#[case(DependencyType::StartToFinish, TaskStatus::Blocked, false)]
#[case(DependencyType::StartToFinish, TaskStatus::InProgress, true)]
fn dependency_types_follow_temporal_rules(
    #[case] dependency_type: DependencyType,
    #[case] prerequisite_status: TaskStatus,
    #[case] expected: bool,
) {
    assert_eq!(dependency_type.is_satisfied_by(prerequisite_status), expected);
}

#[rstest]
fn dependency_check_reports_missing_and_unfinished_prerequisites(
    clock: StepClock,
) -> eyre::Result<()> {
    let orchestration_id = orchestration("orch-domain");
    let mut started = persisted_task(TaskId::new(), &orchestration_id, 0, Vec::new());
    started.transition_to(TaskStatus::InProgress, &clock)?;
    let missing = TaskId::new();
    let dependent = persisted_task(
        TaskId::new(),
        &orchestration_id,
        1,
        vec![
            Dependency::new(started.id(), DependencyType::StartToStart),
            Dependency::finish_to_start(missing),
        ],
    );

    let check = DependencyCheck::evaluate(&dependent, |id| {
        (id == started.id()).then_some(&started)
    });

    ensure!(!check.all_satisfied);
    ensure!(check.satisfied.len() == 1);
    ensure!(check.blocked_by == vec![missing]);
    let Some(unsatisfied) = check.unsatisfied.first() else {
        bail!("missing prerequisite should be unsatisfied");
    };
    ensure!(unsatisfied.current_status.is_none());
    ensure!(unsatisfied.reason.contains("does not exist"));
    Ok(())
}

#[rstest]
fn dependency_type_defaults_when_absent_from_json() -> eyre::Result<()> {
    let prerequisite = TaskId::new();
    let json = format!(r#"{{"taskId":"{prerequisite}"}}"#);
    let dependency: Dependency = serde_json::from_str(&json)?;
    ensure!(dependency == Dependency::finish_to_start(prerequisite));
    Ok(())
}

#[rstest]
fn statistics_cover_every_status_and_priority(clock: StepClock) -> eyre::Result<()> {
    let mut done = Task::new(
        NewTask {
            priority: TaskPriority::High,
            acceptance_criteria: vec!["a".to_owned(), "b".to_owned()],
            estimation: Some(Estimation::new(3.0, 0.8)?),
            ..new_task("Done")
        },
        &clock,
    )?;
    done.transition_to(TaskStatus::InProgress, &clock)?;
    done.transition_to(TaskStatus::Completed, &clock)?;
    done.set_criterion_met(1, true, &clock)?;
    let pending = Task::new(
        NewTask {
            estimation: Some(Estimation::new(1.5, 0.5)?),
            ..new_task("Pending")
        },
        &clock,
    )?;

    let stats = TaskStatistics::from_tasks(&[done, pending]);

    ensure!(stats.total == 2);
    ensure!(stats.by_status.len() == TaskStatus::ALL.len());
    ensure!(stats.count(TaskStatus::Completed) == 1);
    ensure!(stats.count(TaskStatus::NotStarted) == 1);
    ensure!(stats.count(TaskStatus::Failed) == 0);
    ensure!(stats.by_priority.get(&TaskPriority::High) == Some(&1));
    ensure!(stats.average_completion == 50);
    ensure!((stats.estimated_hours - 4.5).abs() < f64::EPSILON);
    ensure!(stats.criteria_met == 1);
    ensure!(stats.criteria_total == 2);
    Ok(())
}

#[rstest]
fn statistics_of_nothing_are_zero() {
    let stats = TaskStatistics::from_tasks(&[]);
    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_completion, 0);
}
