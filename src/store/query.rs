//! Query filters for record scans.

use super::Record;
use crate::OrchestrationId;

/// Filter and window applied to a full scan of one record kind.
///
/// Results are ordered newest first by [`Record::sort_timestamp`] before the
/// offset and limit are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    orchestration_id: Option<OrchestrationId>,
    offset: usize,
    limit: Option<usize>,
}

impl RecordQuery {
    /// Creates an unfiltered, unbounded query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query restricted to one orchestration.
    #[must_use]
    pub fn for_orchestration(orchestration_id: OrchestrationId) -> Self {
        Self::new().with_orchestration(orchestration_id)
    }

    /// Restricts results to one orchestration.
    #[must_use]
    pub fn with_orchestration(mut self, orchestration_id: OrchestrationId) -> Self {
        self.orchestration_id = Some(orchestration_id);
        self
    }

    /// Skips the first `offset` matches.
    #[must_use]
    pub const fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns at most `limit` matches.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the orchestration filter, if any.
    #[must_use]
    pub const fn orchestration_id(&self) -> Option<&OrchestrationId> {
        self.orchestration_id.as_ref()
    }

    /// Returns the number of matches skipped.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the maximum number of matches returned.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub(crate) fn matches<R: Record>(&self, record: &R) -> bool {
        self.orchestration_id
            .as_ref()
            .is_none_or(|wanted| record.orchestration_id() == wanted)
    }

    pub(crate) fn window<R: Record>(&self, mut records: Vec<R>) -> Vec<R> {
        records.sort_by(|left, right| {
            right
                .sort_timestamp()
                .cmp(&left.sort_timestamp())
                .then_with(|| left.record_id().cmp(&right.record_id()))
        });
        records
            .into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}
