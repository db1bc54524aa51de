//! Session aggregate root.

use super::{
    Artifact, ArtifactKind, ContextMessage, Decision, MessageRole, SessionContext,
    SessionDomainError, SessionId, SessionMetadata, SessionState, SessionType, ThinkingMetadata,
    ThinkingSession, ThinkingState, ThinkingStep, ThinkingStepInput,
};
use crate::OrchestrationId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Parameter object for creating a session.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    /// Owning orchestration.
    pub orchestration_id: OrchestrationId,
    /// Workflow phase.
    pub session_type: SessionType,
    /// Task executed or verified by the session.
    pub task_id: Option<TaskId>,
    /// Parent session.
    pub parent_session_id: Option<SessionId>,
    /// Descriptive fields.
    pub metadata: SessionMetadata,
    /// Initial context.
    pub context: SessionContext,
}

/// Session aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    orchestration_id: OrchestrationId,
    #[serde(default)]
    task_id: Option<TaskId>,
    #[serde(rename = "type")]
    session_type: SessionType,
    state: SessionState,
    #[serde(default)]
    context: SessionContext,
    #[serde(default)]
    metadata: SessionMetadata,
    #[serde(default)]
    parent_session_id: Option<SessionId>,
    #[serde(default)]
    child_session_ids: Vec<SessionId>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    failure_reason: Option<String>,
}

/// Parameter object for reconstructing a persisted session aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSessionData {
    /// Persisted session identifier.
    pub id: SessionId,
    /// Persisted orchestration.
    pub orchestration_id: OrchestrationId,
    /// Persisted task link.
    pub task_id: Option<TaskId>,
    /// Persisted workflow phase.
    pub session_type: SessionType,
    /// Persisted state.
    pub state: SessionState,
    /// Persisted context.
    pub context: SessionContext,
    /// Persisted descriptive fields.
    pub metadata: SessionMetadata,
    /// Persisted parent.
    pub parent_session_id: Option<SessionId>,
    /// Persisted children.
    pub child_session_ids: Vec<SessionId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest activity timestamp.
    pub last_activity_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted failure reason.
    pub failure_reason: Option<String>,
}

impl Session {
    /// Creates an `active` session.
    #[must_use]
    pub fn new(request: NewSession, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: SessionId::new(),
            orchestration_id: request.orchestration_id,
            task_id: request.task_id,
            session_type: request.session_type,
            state: SessionState::Active,
            context: request.context,
            metadata: request.metadata,
            parent_session_id: request.parent_session_id,
            child_session_ids: Vec::new(),
            created_at: timestamp,
            last_activity_at: timestamp,
            completed_at: None,
            failure_reason: None,
        }
    }

    /// Reconstructs a session from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSessionData) -> Self {
        Self {
            id: data.id,
            orchestration_id: data.orchestration_id,
            task_id: data.task_id,
            session_type: data.session_type,
            state: data.state,
            context: data.context,
            metadata: data.metadata,
            parent_session_id: data.parent_session_id,
            child_session_ids: data.child_session_ids,
            created_at: data.created_at,
            last_activity_at: data.last_activity_at,
            completed_at: data.completed_at,
            failure_reason: data.failure_reason,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the owning orchestration.
    #[must_use]
    pub const fn orchestration_id(&self) -> &OrchestrationId {
        &self.orchestration_id
    }

    /// Returns the linked task.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Returns the workflow phase.
    #[must_use]
    pub const fn session_type(&self) -> SessionType {
        self.session_type
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the working context.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Returns the parent session.
    #[must_use]
    pub const fn parent_session_id(&self) -> Option<SessionId> {
        self.parent_session_id
    }

    /// Returns the listed children in insertion order.
    #[must_use]
    pub fn child_session_ids(&self) -> &[SessionId] {
        &self.child_session_ids
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest activity timestamp.
    #[must_use]
    pub const fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Returns when the session completed or failed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns why the session failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the metadata name, falling back to the session type.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.session_type.as_str())
    }

    /// Moves the session to `target`.
    ///
    /// Returns `false` for a same-state request, which only refreshes
    /// `last_activity_at`. Completing or failing stamps `completed_at`,
    /// failing records `reason`, and reactivating a failed session clears
    /// both.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::InvalidStateTransition`] when the
    /// transition table does not permit the change.
    pub fn update_state(
        &mut self,
        target: SessionState,
        reason: Option<String>,
        clock: &impl Clock,
    ) -> Result<bool, SessionDomainError> {
        let now = clock.utc();
        if self.state == target {
            self.last_activity_at = now;
            return Ok(false);
        }
        if !self.state.can_transition_to(target) {
            return Err(SessionDomainError::InvalidStateTransition {
                session_id: self.id,
                from: self.state,
                to: target,
            });
        }
        if target.is_finished() {
            self.completed_at = Some(now);
        }
        if target == SessionState::Failed {
            self.failure_reason = reason;
        } else if self.state == SessionState::Failed {
            self.completed_at = None;
            self.failure_reason = None;
        }
        self.state = target;
        self.last_activity_at = now;
        Ok(true)
    }

    /// Appends a message to the context log.
    pub fn add_message(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        metadata: BTreeMap<String, Value>,
        clock: &impl Clock,
    ) -> ContextMessage {
        let message = ContextMessage {
            role,
            content: content.into(),
            timestamp: clock.utc(),
            metadata,
        };
        self.last_activity_at = message.timestamp;
        self.context.messages.push(message.clone());
        message
    }

    /// Appends an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::EmptyArtifactName`] for a blank name.
    pub fn add_artifact(
        &mut self,
        name: &str,
        kind: ArtifactKind,
        content: impl Into<String>,
        metadata: BTreeMap<String, Value>,
        clock: &impl Clock,
    ) -> Result<Artifact, SessionDomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SessionDomainError::EmptyArtifactName);
        }
        let artifact = Artifact {
            name: trimmed.to_owned(),
            kind,
            content: content.into(),
            created_at: clock.utc(),
            metadata,
        };
        self.last_activity_at = artifact.created_at;
        self.context.artifacts.push(artifact.clone());
        Ok(artifact)
    }

    /// Appends a decision.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::EmptyDecision`] for a blank decision.
    pub fn add_decision(
        &mut self,
        decision: &str,
        rationale: impl Into<String>,
        alternatives: Vec<String>,
        clock: &impl Clock,
    ) -> Result<Decision, SessionDomainError> {
        let trimmed = decision.trim();
        if trimmed.is_empty() {
            return Err(SessionDomainError::EmptyDecision);
        }
        let recorded = Decision {
            decision: trimmed.to_owned(),
            rationale: rationale.into(),
            alternatives,
            timestamp: clock.utc(),
        };
        self.last_activity_at = recorded.timestamp;
        self.context.decisions.push(recorded.clone());
        Ok(recorded)
    }

    /// Sets context variable `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::EmptyVariableName`] for a blank key.
    pub fn set_variable(
        &mut self,
        key: &str,
        value: Value,
        clock: &impl Clock,
    ) -> Result<Option<Value>, SessionDomainError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(SessionDomainError::EmptyVariableName);
        }
        let previous = self.context.variables.insert(trimmed.to_owned(), value);
        self.touch(clock);
        Ok(previous)
    }

    /// Replaces or clears the current focus.
    pub fn update_focus(&mut self, focus: Option<String>, clock: &impl Clock) {
        self.context.current_focus = focus.filter(|value| !value.trim().is_empty());
        self.touch(clock);
    }

    /// Starts a reasoning trace, replacing a completed one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::ThinkingAlreadyActive`] while an active
    /// or paused trace exists.
    pub fn start_thinking(
        &mut self,
        metadata: ThinkingMetadata,
        clock: &impl Clock,
    ) -> Result<ThinkingSession, SessionDomainError> {
        if self
            .context
            .thinking
            .as_ref()
            .is_some_and(ThinkingSession::is_open)
        {
            return Err(SessionDomainError::ThinkingAlreadyActive(self.id));
        }
        let now = clock.utc();
        let trace = ThinkingSession::start(metadata, now);
        self.context.thinking = Some(trace.clone());
        self.last_activity_at = now;
        Ok(trace)
    }

    /// Appends a step to the active trace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NoThinkingSession`] without a trace,
    /// [`SessionDomainError::ThinkingNotActive`] unless it is active, and the
    /// step validation errors of [`ThinkingSession::push_step`].
    pub fn add_thinking_step(
        &mut self,
        input: ThinkingStepInput,
        clock: &impl Clock,
    ) -> Result<ThinkingStep, SessionDomainError> {
        let now = clock.utc();
        let step = self
            .trace_in(&[ThinkingState::Active])?
            .push_step(input, now)?;
        self.last_activity_at = now;
        Ok(step)
    }

    /// Completes the open trace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NoThinkingSession`] without a trace and
    /// [`SessionDomainError::ThinkingNotActive`] when it already completed.
    pub fn complete_thinking(
        &mut self,
        clock: &impl Clock,
    ) -> Result<ThinkingSession, SessionDomainError> {
        let now = clock.utc();
        let trace = self.trace_in(&[ThinkingState::Active, ThinkingState::Paused])?;
        trace.finish(now);
        let completed = trace.clone();
        self.last_activity_at = now;
        Ok(completed)
    }

    /// Pauses the active trace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NoThinkingSession`] without a trace and
    /// [`SessionDomainError::ThinkingNotActive`] unless it is active.
    pub fn pause_thinking(&mut self, clock: &impl Clock) -> Result<(), SessionDomainError> {
        self.trace_in(&[ThinkingState::Active])?
            .set_state(ThinkingState::Paused);
        self.touch(clock);
        Ok(())
    }

    /// Resumes the paused trace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::NoThinkingSession`] without a trace and
    /// [`SessionDomainError::ThinkingNotActive`] unless it is paused.
    pub fn resume_thinking(&mut self, clock: &impl Clock) -> Result<(), SessionDomainError> {
        self.trace_in(&[ThinkingState::Paused])?
            .set_state(ThinkingState::Active);
        self.touch(clock);
        Ok(())
    }

    /// Lists `child` after the existing children; repeats are ignored.
    ///
    /// Returns `true` when the listing changed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionDomainError::SelfReference`] when `child` is this
    /// session.
    pub fn add_child(
        &mut self,
        child: SessionId,
        clock: &impl Clock,
    ) -> Result<bool, SessionDomainError> {
        if child == self.id {
            return Err(SessionDomainError::SelfReference(self.id));
        }
        if self.child_session_ids.contains(&child) {
            return Ok(false);
        }
        self.child_session_ids.push(child);
        self.touch(clock);
        Ok(true)
    }

    /// Replaces the child listing, dropping repeats and self references.
    pub fn set_children(&mut self, children: Vec<SessionId>, clock: &impl Clock) {
        let mut seen = HashSet::new();
        let own_id = self.id;
        self.child_session_ids = children
            .into_iter()
            .filter(|child| *child != own_id && seen.insert(*child))
            .collect();
        self.touch(clock);
    }

    /// Returns every shape rule the session violates.
    #[must_use]
    pub fn shape_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.orchestration_id.is_blank() {
            violations.push("orchestrationId must not be empty".to_owned());
        }
        if self.parent_session_id == Some(self.id) {
            violations.push("session is its own parent".to_owned());
        }
        let mut seen = HashSet::new();
        for child in &self.child_session_ids {
            if *child == self.id {
                violations.push("session lists itself as a child".to_owned());
            } else if !seen.insert(*child) {
                violations.push(format!("duplicate child session {child}"));
            }
        }
        if let Some(trace) = &self.context.thinking {
            violations.extend(trace.shape_violations());
        }
        violations
    }

    fn trace_in(
        &mut self,
        allowed: &[ThinkingState],
    ) -> Result<&mut ThinkingSession, SessionDomainError> {
        let session_id = self.id;
        let trace = self
            .context
            .thinking
            .as_mut()
            .ok_or(SessionDomainError::NoThinkingSession(session_id))?;
        if !allowed.contains(&trace.state()) {
            return Err(SessionDomainError::ThinkingNotActive {
                session_id,
                state: trace.state(),
            });
        }
        Ok(trace)
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.last_activity_at = clock.utc();
    }
}
