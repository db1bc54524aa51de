//! Ordered reasoning traces embedded in a session's context.

use super::{SessionDomainError, ThinkingId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a reasoning trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingState {
    /// Steps may be appended.
    Active,
    /// The trace is finished; a new one may replace it.
    Completed,
    /// Temporarily on hold; resumes to active.
    Paused,
}

impl ThinkingState {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ThinkingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive fields supplied when a trace starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingMetadata {
    /// What the trace reasons about.
    #[serde(default)]
    pub topic: Option<String>,
    /// Expected number of steps, if known.
    #[serde(default)]
    pub total_thoughts_estimate: Option<u32>,
    /// Labels.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ThinkingMetadata {
    /// Creates metadata for `topic`.
    #[must_use]
    pub fn about(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    /// Sets the expected number of steps.
    #[must_use]
    pub const fn with_estimate(mut self, total_thoughts: u32) -> Self {
        self.total_thoughts_estimate = Some(total_thoughts);
        self
    }
}

/// One numbered step of a trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingStep {
    /// 1-based position in the trace.
    pub number: u32,
    /// Step text.
    pub thought: String,
    /// Whether the author expects further steps.
    pub more_needed: bool,
    /// Earlier step this one revises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revises_step: Option<u32>,
    /// Earlier step this one branches from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_from_step: Option<u32>,
    /// Label of the branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<String>,
    /// When the step was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Input for appending a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingStepInput {
    thought: String,
    more_needed: bool,
    revises_step: Option<u32>,
    branch_from_step: Option<u32>,
    branch_id: Option<String>,
}

impl ThinkingStepInput {
    /// Creates a step expecting further thoughts.
    #[must_use]
    pub fn new(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            more_needed: true,
            revises_step: None,
            branch_from_step: None,
            branch_id: None,
        }
    }

    /// Marks the step as the last one expected.
    #[must_use]
    pub const fn concluding(mut self) -> Self {
        self.more_needed = false;
        self
    }

    /// Marks the step as revising `step`.
    #[must_use]
    pub const fn revising(mut self, step: u32) -> Self {
        self.revises_step = Some(step);
        self
    }

    /// Marks the step as branching from `step` under `branch_id`.
    #[must_use]
    pub fn branching_from(mut self, step: u32, branch_id: impl Into<String>) -> Self {
        self.branch_from_step = Some(step);
        self.branch_id = Some(branch_id.into());
        self
    }

    /// Sets only the branch label, leaving the origin unset.
    #[must_use]
    pub fn with_branch_id(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }
}

/// A reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingSession {
    id: ThinkingId,
    state: ThinkingState,
    #[serde(default)]
    metadata: ThinkingMetadata,
    #[serde(default)]
    steps: Vec<ThinkingStep>,
    started_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl ThinkingSession {
    /// Starts an empty active trace.
    #[must_use]
    pub fn start(metadata: ThinkingMetadata, now: DateTime<Utc>) -> Self {
        Self {
            id: ThinkingId::new(),
            state: ThinkingState::Active,
            metadata,
            steps: Vec::new(),
            started_at: now,
            completed_at: None,
        }
    }

    /// Returns the trace identifier.
    #[must_use]
    pub const fn id(&self) -> ThinkingId {
        self.id
    }

    /// Returns the trace state.
    #[must_use]
    pub const fn state(&self) -> ThinkingState {
        self.state
    }

    /// Returns the trace metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ThinkingMetadata {
        &self.metadata
    }

    /// Returns the recorded steps in order.
    #[must_use]
    pub fn steps(&self) -> &[ThinkingStep] {
        &self.steps
    }

    /// Returns when the trace started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the trace completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns `true` unless the trace has completed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != ThinkingState::Completed
    }

    /// Appends a step numbered after the last one.
    ///
    /// Returns a copy of the recorded step.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError`] when the thought is blank, a step
    /// reference falls outside the recorded steps or a branch label lacks an
    /// origin. The trace state is checked by the owning session.
    pub fn push_step(
        &mut self,
        input: ThinkingStepInput,
        now: DateTime<Utc>,
    ) -> Result<ThinkingStep, SessionDomainError> {
        if input.thought.trim().is_empty() {
            return Err(SessionDomainError::EmptyThought);
        }
        if input.branch_id.is_some() && input.branch_from_step.is_none() {
            return Err(SessionDomainError::BranchWithoutOrigin);
        }
        let len = self.steps.len();
        check_reference("revises_step", input.revises_step, len)?;
        check_reference("branch_from_step", input.branch_from_step, len)?;

        let number = u32::try_from(len)
            .ok()
            .and_then(|count| count.checked_add(1))
            .ok_or(SessionDomainError::InvalidThinkingReference {
                field: "number",
                step: u32::MAX,
                len,
            })?;
        let step = ThinkingStep {
            number,
            thought: input.thought,
            more_needed: input.more_needed,
            revises_step: input.revises_step,
            branch_from_step: input.branch_from_step,
            branch_id: input.branch_id,
            timestamp: now,
        };
        self.steps.push(step.clone());
        Ok(step)
    }

    pub(crate) const fn set_state(&mut self, state: ThinkingState) {
        self.state = state;
    }

    pub(crate) const fn finish(&mut self, now: DateTime<Utc>) {
        self.state = ThinkingState::Completed;
        self.completed_at = Some(now);
    }

    /// Returns every shape rule the trace violates.
    #[must_use]
    pub fn shape_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (position, step) in self.steps.iter().enumerate() {
            let expected = u32::try_from(position).ok().and_then(|p| p.checked_add(1));
            if Some(step.number) != expected {
                violations.push(format!(
                    "thinking step at position {position} is numbered {}",
                    step.number
                ));
            }
            for (field, reference) in [
                ("revisesStep", step.revises_step),
                ("branchFromStep", step.branch_from_step),
            ] {
                if reference.is_some_and(|target| target == 0 || target >= step.number) {
                    violations.push(format!(
                        "thinking step {} has {field} pointing forward",
                        step.number
                    ));
                }
            }
        }
        violations
    }
}

fn check_reference(
    field: &'static str,
    reference: Option<u32>,
    len: usize,
) -> Result<(), SessionDomainError> {
    let Some(step) = reference else {
        return Ok(());
    };
    let in_range = step >= 1 && usize::try_from(step).is_ok_and(|index| index <= len);
    if in_range {
        Ok(())
    } else {
        Err(SessionDomainError::InvalidThinkingReference { field, step, len })
    }
}
