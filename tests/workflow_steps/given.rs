//! Given steps for workflow engine BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::engine::Engine;
use atelier::session::{domain::SessionType, services::CreateSessionRequest};
use atelier::task::{
    domain::{Dependency, TaskStatus},
    services::{CreateTaskRequest, UpdateTaskRequest},
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;

#[given("an empty workflow store")]
fn empty_workflow_store(world: &mut WorkflowWorld) -> Result<(), eyre::Report> {
    let engine = run_async(Engine::open(world.config.clone())).wrap_err("open engine")?;
    world.engine = Some(engine);
    Ok(())
}

#[given(r#"task "{label}" with no dependencies"#)]
fn task_without_dependencies(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new(world.orchestration_id.clone(), label.clone());
    let task = run_async(world.engine()?.tasks().create_task(request))
        .wrap_err("create task without dependencies")?;
    world.tasks.insert(label, task);
    Ok(())
}

#[given(r#"task "{label}" depending on "{prerequisite}""#)]
fn task_with_dependency(
    world: &mut WorkflowWorld,
    label: String,
    prerequisite: String,
) -> Result<(), eyre::Report> {
    let prerequisite_id = world.task(&prerequisite)?.id();
    let request = CreateTaskRequest::new(world.orchestration_id.clone(), label.clone())
        .with_dependency(Dependency::finish_to_start(prerequisite_id));
    let task = run_async(world.engine()?.tasks().create_task(request))
        .wrap_err("create dependent task")?;
    world.tasks.insert(label, task);
    Ok(())
}

#[given(r#"task "{label}" is rewritten on disk to depend on "{prerequisite}""#)]
fn task_rewritten_with_dependency(
    world: &mut WorkflowWorld,
    label: String,
    prerequisite: String,
) -> Result<(), eyre::Report> {
    let prerequisite_id = world.task(&prerequisite)?.id();
    let mut task = world.task(&label)?.clone();
    task.add_dependency(Dependency::finish_to_start(prerequisite_id), &DefaultClock)?;
    run_async(world.task_records()?.save(&task)).wrap_err("write task bypassing cycle checks")?;
    world.tasks.insert(label, task);
    Ok(())
}

#[given(r#"task "{label}" has been started"#)]
fn task_started(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&label)?.id();
    let update = UpdateTaskRequest::new().with_status(TaskStatus::InProgress);
    let task = run_async(world.engine()?.tasks().update_task(task_id, update))
        .wrap_err("start task")?;
    world.tasks.insert(label, task);
    Ok(())
}

#[given(r#"the file of task "{label}" is truncated"#)]
fn task_file_truncated(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let task_id = world.task(&label)?.id();
    let path = world.task_records()?.path_for(&task_id.to_string())?;
    let text = std::fs::read_to_string(&path).wrap_err("read task document")?;
    let prefix = text
        .get(..text.len() / 2)
        .ok_or_else(|| eyre::eyre!("task document should be ASCII"))?;
    std::fs::write(&path, prefix).wrap_err("truncate task document")?;
    Ok(())
}

#[given(r#"a planning session "{label}""#)]
fn planning_session(world: &mut WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let request = CreateSessionRequest::new(world.orchestration_id.clone(), SessionType::Planning)
        .with_name(label.clone());
    let session = run_async(world.engine()?.sessions().create_session(request))
        .wrap_err("create planning session")?;
    world.sessions.insert(label, session);
    Ok(())
}

#[given(r#"a task session "{label}" under "{parent}""#)]
fn task_session_under(
    world: &mut WorkflowWorld,
    label: String,
    parent: String,
) -> Result<(), eyre::Report> {
    let parent_id = world.session(&parent)?.id();
    let request = CreateSessionRequest::new(world.orchestration_id.clone(), SessionType::Task)
        .with_parent(parent_id)
        .with_name(label.clone());
    let session = run_async(world.engine()?.sessions().create_session(request))
        .wrap_err("create child session")?;
    world.sessions.insert(label, session);
    Ok(())
}
