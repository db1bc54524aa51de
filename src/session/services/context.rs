//! Context accumulation and reasoning traces.
//!
//! Every operation reads the session, applies one change and writes the
//! whole record back. Context mutations are accepted in any state.

use super::lifecycle::{SessionService, SessionServiceResult};
use crate::session::{
    domain::{
        Artifact, ArtifactKind, ContextMessage, Decision, MessageRole, Session, SessionId,
        ThinkingMetadata, ThinkingSession, ThinkingStep, ThinkingStepInput,
    },
    ports::SessionRepository,
};
use mockable::Clock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Request payload for recording an artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactInput {
    name: String,
    kind: ArtifactKind,
    content: String,
    metadata: BTreeMap<String, Value>,
}

impl ArtifactInput {
    /// Creates an artifact payload.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ArtifactKind, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Request payload for recording a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionInput {
    decision: String,
    rationale: String,
    alternatives: Vec<String>,
}

impl DecisionInput {
    /// Creates a decision payload.
    #[must_use]
    pub fn new(decision: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            decision: decision.into(),
            rationale: rationale.into(),
            alternatives: Vec::new(),
        }
    }

    /// Records a rejected alternative.
    #[must_use]
    pub fn with_alternative(mut self, alternative: impl Into<String>) -> Self {
        self.alternatives.push(alternative.into());
        self
    }
}

impl<R, C> SessionService<R, C>
where
    R: SessionRepository,
    C: Clock + Send + Sync,
{
    /// Appends a message to the session log.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::NotFound`] for an unknown
    /// session and [`super::SessionServiceError::Repository`] when
    /// persistence fails.
    pub async fn add_message(
        &self,
        session_id: SessionId,
        role: MessageRole,
        content: impl Into<String>,
        metadata: BTreeMap<String, Value>,
    ) -> SessionServiceResult<ContextMessage> {
        let (_, message) = self
            .mutate(session_id, |session, clock| {
                Ok(session.add_message(role, content, metadata, clock))
            })
            .await?;
        Ok(message)
    }

    /// Records an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] for a blank name,
    /// [`super::SessionServiceError::NotFound`] for an unknown session and
    /// [`super::SessionServiceError::Repository`] when persistence fails.
    pub async fn add_artifact(
        &self,
        session_id: SessionId,
        input: ArtifactInput,
    ) -> SessionServiceResult<Artifact> {
        let (_, artifact) = self
            .mutate(session_id, |session, clock| {
                session.add_artifact(
                    &input.name,
                    input.kind,
                    input.content,
                    input.metadata,
                    clock,
                )
            })
            .await?;
        Ok(artifact)
    }

    /// Records a decision.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] for a blank decision,
    /// [`super::SessionServiceError::NotFound`] for an unknown session and
    /// [`super::SessionServiceError::Repository`] when persistence fails.
    pub async fn add_decision(
        &self,
        session_id: SessionId,
        input: DecisionInput,
    ) -> SessionServiceResult<Decision> {
        let (_, decision) = self
            .mutate(session_id, |session, clock| {
                session.add_decision(&input.decision, input.rationale, input.alternatives, clock)
            })
            .await?;
        Ok(decision)
    }

    /// Sets a context variable, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] for a blank key,
    /// [`super::SessionServiceError::NotFound`] for an unknown session and
    /// [`super::SessionServiceError::Repository`] when persistence fails.
    pub async fn set_variable(
        &self,
        session_id: SessionId,
        key: &str,
        value: Value,
    ) -> SessionServiceResult<Option<Value>> {
        let (_, previous) = self
            .mutate(session_id, |session, clock| {
                session.set_variable(key, value, clock)
            })
            .await?;
        Ok(previous)
    }

    /// Replaces or clears the current focus.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::NotFound`] for an unknown
    /// session and [`super::SessionServiceError::Repository`] when
    /// persistence fails.
    pub async fn update_focus(
        &self,
        session_id: SessionId,
        focus: Option<String>,
    ) -> SessionServiceResult<Session> {
        let (session, ()) = self
            .mutate(session_id, |session, clock| {
                session.update_focus(focus, clock);
                Ok(())
            })
            .await?;
        Ok(session)
    }

    /// Starts a reasoning trace.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] while another trace is
    /// open, [`super::SessionServiceError::NotFound`] for an unknown session
    /// and [`super::SessionServiceError::Repository`] when persistence fails.
    pub async fn start_thinking(
        &self,
        session_id: SessionId,
        metadata: ThinkingMetadata,
    ) -> SessionServiceResult<ThinkingSession> {
        let (_, trace) = self
            .mutate(session_id, |session, clock| {
                session.start_thinking(metadata, clock)
            })
            .await?;
        Ok(trace)
    }

    /// Appends a step to the active trace.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] without an active trace
    /// or for an invalid step, [`super::SessionServiceError::NotFound`] for
    /// an unknown session and [`super::SessionServiceError::Repository`]
    /// when persistence fails.
    pub async fn add_thinking_step(
        &self,
        session_id: SessionId,
        input: ThinkingStepInput,
    ) -> SessionServiceResult<ThinkingStep> {
        let (_, step) = self
            .mutate(session_id, |session, clock| {
                session.add_thinking_step(input, clock)
            })
            .await?;
        Ok(step)
    }

    /// Completes the open trace.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] without an open trace,
    /// [`super::SessionServiceError::NotFound`] for an unknown session and
    /// [`super::SessionServiceError::Repository`] when persistence fails.
    pub async fn complete_thinking(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<ThinkingSession> {
        let (_, trace) = self
            .mutate(session_id, |session, clock| session.complete_thinking(clock))
            .await?;
        Ok(trace)
    }

    /// Pauses the active trace.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] unless the trace is
    /// active, [`super::SessionServiceError::NotFound`] for an unknown
    /// session and [`super::SessionServiceError::Repository`] when
    /// persistence fails.
    pub async fn pause_thinking(&self, session_id: SessionId) -> SessionServiceResult<Session> {
        let (session, ()) = self
            .mutate(session_id, |session, clock| session.pause_thinking(clock))
            .await?;
        Ok(session)
    }

    /// Resumes the paused trace.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Domain`] unless the trace is
    /// paused, [`super::SessionServiceError::NotFound`] for an unknown
    /// session and [`super::SessionServiceError::Repository`] when
    /// persistence fails.
    pub async fn resume_thinking(&self, session_id: SessionId) -> SessionServiceResult<Session> {
        let (session, ()) = self
            .mutate(session_id, |session, clock| session.resume_thinking(clock))
            .await?;
        Ok(session)
    }
}
