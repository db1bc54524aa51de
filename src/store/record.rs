//! The contract every persisted record kind implements.

use super::Salvage;
use crate::OrchestrationId;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

/// The three record kinds kept by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Session records.
    Session,
    /// Task records.
    Task,
    /// Plan records.
    Plan,
}

impl RecordKind {
    /// Returns the singular label used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Task => "task",
            Self::Plan => "plan",
        }
    }

    /// Returns the directory name holding records of this kind.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Session => "sessions",
            Self::Task => "tasks",
            Self::Plan => "plans",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document stored as one JSON file per record.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind of this record.
    const KIND: RecordKind;

    /// Returns the identifier used as the file stem.
    fn record_id(&self) -> String;

    /// Returns the orchestration the record belongs to.
    fn orchestration_id(&self) -> &OrchestrationId;

    /// Returns the timestamp used to order query results, newest first.
    fn sort_timestamp(&self) -> DateTime<Utc>;

    /// Returns every shape rule the record violates; empty when valid.
    fn validate(&self) -> Vec<String>;

    /// Builds a minimal valid record from fields salvaged out of a damaged
    /// document.
    ///
    /// `id_hint` is the file stem; implementations prefer it over a salvaged
    /// identifier so the rebuilt record stays addressable.
    fn reconstruct(id_hint: &str, salvage: &Salvage, now: DateTime<Utc>) -> Self;
}
