//! Unit tests for context accumulation and reasoning traces.

use super::{Seed, orchestration};
use crate::ErrorKind;
use crate::session::domain::{
    ArtifactKind, MessageRole, Session, SessionDomainError, SessionState, SessionSummary,
    ThinkingMetadata, ThinkingState, ThinkingStepInput,
};
use crate::test_support::StepClock;
use eyre::{bail, ensure};
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::BTreeMap;

#[fixture]
fn clock() -> StepClock {
    StepClock::new()
}

#[fixture]
fn session() -> Session {
    Seed::new(0).build(&orchestration("orch-context"))
}

#[rstest]
fn mutations_append_in_order_and_touch_activity(
    clock: StepClock,
    mut session: Session,
) -> eyre::Result<()> {
    let started = session.last_activity_at();
    session.add_message(MessageRole::User, "first", BTreeMap::new(), &clock);
    session.add_message(MessageRole::Assistant, "second", BTreeMap::new(), &clock);
    let artifact = session.add_artifact(
        "  plan.md ",
        ArtifactKind::Plan,
        "# Plan",
        BTreeMap::new(),
        &clock,
    )?;

    let messages = &session.context().messages;
    ensure!(messages.len() == 2);
    ensure!(messages.first().map(|message| message.content.as_str()) == Some("first"));
    ensure!(artifact.name == "plan.md");
    ensure!(session.last_activity_at() == artifact.created_at);
    ensure!(session.last_activity_at() > started);
    Ok(())
}

#[rstest]
fn context_mutations_are_accepted_after_completion(
    clock: StepClock,
    session: Session,
) -> eyre::Result<()> {
    let mut finished = session;
    finished.update_state(SessionState::Completed, None, &clock)?;

    finished.add_decision("ship it", "tests pass", vec!["wait".to_owned()], &clock)?;

    ensure!(finished.context().decisions.len() == 1);
    ensure!(finished.state() == SessionState::Completed);
    Ok(())
}

#[rstest]
fn blank_names_are_rejected(clock: StepClock, mut session: Session) -> eyre::Result<()> {
    let artifact = session.add_artifact(" ", ArtifactKind::Code, "", BTreeMap::new(), &clock);
    let decision = session.add_decision("", "", Vec::new(), &clock);
    let variable = session.set_variable("  ", json!(1), &clock);

    ensure!(artifact == Err(SessionDomainError::EmptyArtifactName));
    ensure!(decision == Err(SessionDomainError::EmptyDecision));
    ensure!(variable == Err(SessionDomainError::EmptyVariableName));
    ensure!(session.context().artifacts.is_empty());
    Ok(())
}

#[rstest]
fn set_variable_returns_the_previous_value(
    clock: StepClock,
    mut session: Session,
) -> eyre::Result<()> {
    ensure!(session.set_variable("attempts", json!(1), &clock)?.is_none());
    ensure!(session.set_variable("attempts", json!(2), &clock)? == Some(json!(1)));
    ensure!(session.context().variables.get("attempts") == Some(&json!(2)));
    Ok(())
}

#[rstest]
fn blank_focus_clears_it(clock: StepClock, mut session: Session) {
    session.update_focus(Some("parser".to_owned()), &clock);
    assert_eq!(session.context().current_focus.as_deref(), Some("parser"));

    session.update_focus(Some("   ".to_owned()), &clock);
    assert!(session.context().current_focus.is_none());
}

#[rstest]
fn thinking_steps_are_numbered_contiguously(
    clock: StepClock,
    mut session: Session,
) -> eyre::Result<()> {
    session.start_thinking(ThinkingMetadata::about("cache design").with_estimate(3), &clock)?;
    let first = session.add_thinking_step(ThinkingStepInput::new("measure"), &clock)?;
    let second = session.add_thinking_step(ThinkingStepInput::new("remeasure").revising(1), &clock)?;
    let third = session.add_thinking_step(
        ThinkingStepInput::new("try lru")
            .branching_from(1, "lru")
            .concluding(),
        &clock,
    )?;

    ensure!([first.number, second.number, third.number] == [1, 2, 3]);
    ensure!(second.revises_step == Some(1));
    ensure!(third.branch_id.as_deref() == Some("lru"));
    ensure!(!third.more_needed);
    ensure!(session.shape_violations().is_empty());
    Ok(())
}

#[rstest]
#[case(ThinkingStepInput::new("ahead").revising(2), "revises_step")]
#[case(ThinkingStepInput::new("zero").revising(0), "revises_step")]
#[case(ThinkingStepInput::new("fork").branching_from(5, "b"), "branch_from_step")]
fn step_references_must_point_at_recorded_steps(
    clock: StepClock,
    mut session: Session,
    #[case] input: ThinkingStepInput,
    #[case] expected_field: &str,
) -> eyre::Result<()> {
    session.start_thinking(ThinkingMetadata::default(), &clock)?;
    session.add_thinking_step(ThinkingStepInput::new("only step"), &clock)?;

    let Err(error) = session.add_thinking_step(input, &clock) else {
        bail!("reference outside the trace should be rejected");
    };

    ensure!(error.kind() == ErrorKind::ValidationFailed);
    ensure!(matches!(
        error,
        SessionDomainError::InvalidThinkingReference { field, len: 1, .. } if field == expected_field
    ));
    Ok(())
}

#[rstest]
fn branch_label_requires_an_origin(clock: StepClock, mut session: Session) -> eyre::Result<()> {
    session.start_thinking(ThinkingMetadata::default(), &clock)?;

    let result = session.add_thinking_step(ThinkingStepInput::new("x").with_branch_id("b"), &clock);

    ensure!(result == Err(SessionDomainError::BranchWithoutOrigin));
    Ok(())
}

#[rstest]
fn steps_require_an_active_trace(clock: StepClock, mut session: Session) -> eyre::Result<()> {
    let missing = session.add_thinking_step(ThinkingStepInput::new("x"), &clock);
    ensure!(matches!(missing, Err(SessionDomainError::NoThinkingSession(_))));

    session.start_thinking(ThinkingMetadata::default(), &clock)?;
    session.pause_thinking(&clock)?;
    let paused = session.add_thinking_step(ThinkingStepInput::new("x"), &clock);
    ensure!(matches!(
        paused,
        Err(SessionDomainError::ThinkingNotActive {
            state: ThinkingState::Paused,
            ..
        })
    ));

    session.resume_thinking(&clock)?;
    session.add_thinking_step(ThinkingStepInput::new("x"), &clock)?;
    Ok(())
}

#[rstest]
fn open_trace_blocks_a_new_one_until_completed(
    clock: StepClock,
    mut session: Session,
) -> eyre::Result<()> {
    let first = session.start_thinking(ThinkingMetadata::about("one"), &clock)?;
    let Err(error) = session.start_thinking(ThinkingMetadata::about("two"), &clock) else {
        bail!("second trace should be rejected while the first is open");
    };
    ensure!(error.kind() == ErrorKind::StateTransitionRejected);

    let completed = session.complete_thinking(&clock)?;
    ensure!(completed.state() == ThinkingState::Completed);
    ensure!(completed.completed_at().is_some());
    ensure!(session.complete_thinking(&clock).is_err());

    let second = session.start_thinking(ThinkingMetadata::about("two"), &clock)?;
    ensure!(second.id() != first.id());
    ensure!(second.steps().is_empty());
    Ok(())
}

#[rstest]
fn summary_keeps_the_five_latest_decisions(
    clock: StepClock,
    mut session: Session,
) -> eyre::Result<()> {
    for index in 0..7 {
        session.add_decision(&format!("decision {index}"), "", Vec::new(), &clock)?;
    }
    session.add_artifact("out.txt", ArtifactKind::Report, "done", BTreeMap::new(), &clock)?;

    let summary = SessionSummary::from_session(&session);

    ensure!(summary.decision_count == 7);
    ensure!(summary.recent_decisions.len() == 5);
    ensure!(
        summary.recent_decisions.first().map(|decision| decision.decision.as_str())
            == Some("decision 2")
    );
    ensure!(summary.artifact_names == ["out.txt"]);
    Ok(())
}
