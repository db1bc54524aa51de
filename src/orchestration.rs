//! Orchestration grouping key shared by sessions, tasks and plans.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const RECOVERED: &str = "recovered";

/// Identifier grouping every record that belongs to one workflow instance.
///
/// An orchestration has no record of its own: it exists while at least one
/// session, task or plan references it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrchestrationId(String);

/// Error returned when an orchestration identifier is blank.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("orchestration identifier must not be empty")]
pub struct EmptyOrchestrationId;

impl OrchestrationId {
    /// Creates a validated orchestration identifier.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyOrchestrationId`] when the value is empty after
    /// trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyOrchestrationId> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmptyOrchestrationId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the placeholder assigned to reconstructed records whose
    /// orchestration could not be salvaged.
    #[must_use]
    pub fn recovered() -> Self {
        Self(RECOVERED.to_owned())
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the identifier is blank.
    ///
    /// Only values deserialized from damaged records can be blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl AsRef<str> for OrchestrationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for OrchestrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
