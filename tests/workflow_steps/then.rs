//! Then steps for workflow engine BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use atelier::ErrorKind;
use atelier::store::RecoveryMethod;
use atelier::task::domain::TaskStatus;
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then(r#"the next task is "{label}""#)]
fn next_task_is(world: &WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    let expected = world.task(&label)?.id();
    let next = world
        .next_task
        .as_ref()
        .ok_or_else(|| eyre::eyre!("next task was not requested"))?
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no task is ready"))?;
    if next.id() != expected {
        return Err(eyre::eyre!("expected {label}, got {}", next.name()));
    }
    Ok(())
}

fn dependencies_satisfied(world: &WorkflowWorld, label: &str) -> Result<bool, eyre::Report> {
    let task_id = world.task(label)?.id();
    let check = run_async(world.engine()?.tasks().check_dependencies(task_id))
        .wrap_err("check dependencies")?;
    Ok(check.all_satisfied)
}

#[then(r#"the dependencies of "{label}" are all satisfied"#)]
fn dependencies_all_satisfied(world: &WorkflowWorld, label: String) -> Result<(), eyre::Report> {
    if !dependencies_satisfied(world, &label)? {
        return Err(eyre::eyre!("dependencies of {label} should hold"));
    }
    Ok(())
}

#[then(r#"the dependencies of "{label}" are not all satisfied"#)]
fn dependencies_not_all_satisfied(
    world: &WorkflowWorld,
    label: String,
) -> Result<(), eyre::Report> {
    if dependencies_satisfied(world, &label)? {
        return Err(eyre::eyre!("dependencies of {label} should not hold yet"));
    }
    Ok(())
}

#[then(r#"the graph is invalid with one cycle containing "{first}" and "{second}""#)]
fn graph_has_one_cycle(
    world: &WorkflowWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let validation = world
        .validation
        .as_ref()
        .ok_or_else(|| eyre::eyre!("dependencies were not validated"))?;
    if validation.is_valid {
        return Err(eyre::eyre!("graph with a cycle should be invalid"));
    }
    let [cycle] = validation.cycles.as_slice() else {
        return Err(eyre::eyre!("expected one cycle, got {:?}", validation.cycles));
    };
    let first_id = world.task(&first)?.id();
    let second_id = world.task(&second)?.id();
    if !(cycle.contains(&first_id) && cycle.contains(&second_id)) {
        return Err(eyre::eyre!("cycle {cycle:?} should contain {first} and {second}"));
    }
    Ok(())
}

#[then("loading fails as corrupted")]
fn loading_fails_as_corrupted(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    match world.load_error {
        Some(ErrorKind::Corrupted) => Ok(()),
        other => Err(eyre::eyre!("expected a corrupted error, got {other:?}")),
    }
}

#[then("the recovered task keeps its identifier")]
fn recovered_task_keeps_identifier(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    let recovered = world
        .recovered
        .as_ref()
        .ok_or_else(|| eyre::eyre!("task was not recovered"))?;
    let original = world
        .tasks
        .values()
        .find(|task| task.id() == recovered.record.id());
    if original.is_none() {
        return Err(eyre::eyre!("recovered identifier does not match any task"));
    }
    Ok(())
}

#[then("the recovered task is not started and flagged as reconstructed")]
fn recovered_task_is_reconstructed(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    let recovered = world
        .recovered
        .as_ref()
        .ok_or_else(|| eyre::eyre!("task was not recovered"))?;
    if recovered.method != RecoveryMethod::Reconstructed || !recovered.reconstructed() {
        return Err(eyre::eyre!("expected reconstruction, got {:?}", recovered.method));
    }
    if recovered.record.status() != TaskStatus::NotStarted {
        return Err(eyre::eyre!(
            "reconstructed task should be not_started, got {}",
            recovered.record.status()
        ));
    }
    Ok(())
}

#[then(r#"the parent of "{child}" is "{parent}""#)]
fn parent_of_is(world: &WorkflowWorld, child: String, parent: String) -> Result<(), eyre::Report> {
    let related = world
        .related
        .as_ref()
        .ok_or_else(|| eyre::eyre!("related sessions were not requested for {child}"))?;
    let expected = world.session(&parent)?.id();
    let actual = related.parent.as_ref().map(atelier::session::domain::Session::id);
    if actual != Some(expected) {
        return Err(eyre::eyre!("parent of {child} should be {parent}"));
    }
    Ok(())
}

#[then(r#"session "{parent}" lists "{child}" as a child"#)]
fn session_lists_child(
    world: &WorkflowWorld,
    parent: String,
    child: String,
) -> Result<(), eyre::Report> {
    let parent_id = world.session(&parent)?.id();
    let child_id = world.session(&child)?.id();
    let stored = run_async(world.engine()?.sessions().get_session(parent_id))
        .wrap_err("load parent session")?
        .ok_or_else(|| eyre::eyre!("parent session {parent} should exist"))?;
    if !stored.child_session_ids().contains(&child_id) {
        return Err(eyre::eyre!("{parent} should list {child}"));
    }
    Ok(())
}
