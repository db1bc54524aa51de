//! Results of destructive store operations.

use super::BackupRecord;
use serde::Serialize;

/// Result of removing a single record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemovalOutcome {
    /// Whether a record existed and was removed.
    pub existed: bool,
    /// Backup taken before removal, if any.
    pub backup: Option<BackupRecord>,
}

impl RemovalOutcome {
    /// Returns whether a backup was written before removal.
    #[must_use]
    pub const fn backed_up(&self) -> bool {
        self.backup.is_some()
    }
}

/// A record a bulk operation could not remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    /// Identifier of the record.
    pub id: String,
    /// Rendered error.
    pub reason: String,
}

/// Tally of a bulk destructive operation.
///
/// Bulk operations never abort half-way; each record is attempted and the
/// result recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    /// Records backed up before removal.
    pub backed_up: usize,
    /// Records removed.
    pub removed: usize,
    /// Records that could not be removed.
    pub failed: usize,
    /// Details for each failure.
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    /// Records the outcome of one removal.
    pub fn record_removal(&mut self, outcome: &RemovalOutcome) {
        if outcome.existed {
            self.removed += 1;
        }
        if outcome.backed_up() {
            self.backed_up += 1;
        }
    }

    /// Records a failed removal.
    pub fn record_failure(&mut self, id: impl Into<String>, error: &impl std::fmt::Display) {
        self.failed += 1;
        self.failures.push(BulkFailure {
            id: id.into(),
            reason: error.to_string(),
        });
    }

    /// Folds another tally into this one.
    pub fn merge(&mut self, other: Self) {
        self.backed_up += other.backed_up;
        self.removed += other.removed;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

