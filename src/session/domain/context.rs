//! Accumulated working context of a session.

use super::ThinkingSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Author of a context message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Human input.
    User,
    /// Model output.
    Assistant,
    /// Instructions injected by the host.
    System,
    /// Output of a tool invocation.
    Tool,
}

/// One entry of the ordered message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMessage {
    /// Author.
    pub role: MessageRole,
    /// Message body.
    pub content: String,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// Category of an artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Source code.
    Code,
    /// Prose documentation.
    Document,
    /// A plan or outline.
    Plan,
    /// Findings or status report.
    Report,
    /// Test code or results.
    Test,
    /// Structured data.
    Data,
    /// Anything else.
    #[default]
    Other,
}

/// A named output produced during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Display name, unique by convention only.
    pub name: String,
    /// Category.
    #[serde(rename = "type", default)]
    pub kind: ArtifactKind,
    /// Artifact body.
    pub content: String,
    /// When the artifact was recorded.
    pub created_at: DateTime<Utc>,
    /// Free-form annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// A recorded choice and its reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// What was decided.
    pub decision: String,
    /// Why.
    #[serde(default)]
    pub rationale: String,
    /// Options considered and rejected.
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// When the decision was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Working context carried by a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Ordered message log.
    #[serde(default)]
    pub messages: Vec<ContextMessage>,
    /// Produced artifacts, in creation order.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Recorded decisions, in creation order.
    #[serde(default)]
    pub decisions: Vec<Decision>,
    /// What the session is currently working on.
    #[serde(default)]
    pub current_focus: Option<String>,
    /// Embedded reasoning trace, if one was started.
    #[serde(default)]
    pub thinking: Option<ThinkingSession>,
    /// Keyed scratch values.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// Descriptive fields of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Host-defined values.
    #[serde(default)]
    pub user_data: BTreeMap<String, Value>,
}

impl SessionMetadata {
    /// Creates metadata with a display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
