//! When steps for workflow engine BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::task::{domain::TaskStatus, services::UpdateTaskRequest};
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the next task is requested")]
fn next_task_requested(world: &mut WorkflowWorld) -> Result<(), eyre::Report> {
    let next = run_async(world.engine()?.tasks().get_next_task(&world.orchestration_id))
        .wrap_err("pick next task")?;
    world.next_task = Some(next);
    Ok(())
}

#[when(r#"task "{label}" is completed"#)]
fn task_completed(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&label)?.id();
    let tasks = world.engine()?.tasks();
    run_async(tasks.update_task(
        task_id,
        UpdateTaskRequest::new().with_status(TaskStatus::InProgress),
    ))
    .wrap_err("start task")?;
    let task = run_async(tasks.update_task(
        task_id,
        UpdateTaskRequest::new().with_status(TaskStatus::Completed),
    ))
    .wrap_err("complete task")?;
    world.tasks.insert(label, task);
    Ok(())
}

#[when("the dependencies are validated")]
fn dependencies_validated(world: &mut WorkflowWorld) -> Result<(), eyre::Report> {
    let validation = run_async(
        world
            .engine()?
            .tasks()
            .validate_dependencies(&world.orchestration_id),
    )
    .wrap_err("validate dependencies")?;
    world.validation = Some(validation);
    Ok(())
}

#[when(r#"task "{label}" is loaded"#)]
fn task_loaded(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&label)?.id();
    let records = world.task_records()?;
    let load_error = run_async(records.load(&task_id.to_string()))
        .err()
        .map(|error| error.kind());
    world.load_error = load_error;
    Ok(())
}

#[when(r#"task "{label}" is recovered"#)]
fn task_recovered(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&label)?.id();
    let recovered = run_async(world.task_records()?.recover(&task_id.to_string()))
        .wrap_err("recover task document")?;
    world.recovered = Some(recovered);
    Ok(())
}

#[when(r#"the sessions related to "{label}" are requested"#)]
fn related_sessions_requested(
    world: &mut WorkflowWorld,
    label: String,
) -> Result<(), eyre::Report> {
    let session_id = world.session(&label)?.id();
    let related = run_async(world.engine()?.sessions().find_related_sessions(session_id))
        .wrap_err("find related sessions")?;
    world.related = Some(related);
    Ok(())
}
