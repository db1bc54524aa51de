//! Removal of finished sessions.

use super::lifecycle::{SessionService, SessionServiceResult};
use crate::session::{
    domain::{Session, SessionId},
    ports::SessionRepository,
};
use crate::store::BulkOutcome;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

impl<R, C> SessionService<R, C>
where
    R: SessionRepository,
    C: Clock + Send + Sync,
{
    /// Removes every completed or failed session.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Repository`] when the scan
    /// fails. Individual removal failures are reported in the outcome.
    pub async fn cleanup_sessions(&self) -> SessionServiceResult<BulkOutcome> {
        let outcome = self.remove_finished(|_| true).await?;
        info!(
            removed = outcome.removed,
            backed_up = outcome.backed_up,
            failed = outcome.failed,
            "finished sessions cleaned up"
        );
        Ok(outcome)
    }

    /// Removes completed or failed sessions idle for more than
    /// `older_than_days` days. An age reaching back past the earliest
    /// representable instant archives nothing.
    ///
    /// # Errors
    ///
    /// Returns [`super::SessionServiceError::Repository`] when the scan
    /// fails. Individual removal failures are reported in the outcome.
    pub async fn archive_sessions(&self, older_than_days: u32) -> SessionServiceResult<BulkOutcome> {
        let cutoff = Duration::try_days(i64::from(older_than_days))
            .and_then(|age| self.clock.utc().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let outcome = self
            .remove_finished(|session| session.last_activity_at() < cutoff)
            .await?;
        info!(
            older_than_days,
            %cutoff,
            removed = outcome.removed,
            backed_up = outcome.backed_up,
            failed = outcome.failed,
            "finished sessions archived"
        );
        Ok(outcome)
    }

    /// Removes the eligible finished sessions, then drops them from the
    /// child listings of surviving parents.
    async fn remove_finished(
        &self,
        eligible: impl Fn(&Session) -> bool,
    ) -> SessionServiceResult<BulkOutcome> {
        let sessions = self.repository.list_all().await?;
        let mut outcome = BulkOutcome::default();
        let mut removed = HashSet::new();
        let mut unlink: HashMap<SessionId, Vec<SessionId>> = HashMap::new();
        for session in sessions
            .iter()
            .filter(|session| session.state().is_finished() && eligible(session))
        {
            match self.repository.remove(session.id()).await {
                Ok(removal) => {
                    outcome.record_removal(&removal);
                    removed.insert(session.id());
                    if let Some(parent) = session.parent_session_id() {
                        unlink.entry(parent).or_default().push(session.id());
                    }
                }
                Err(error) => outcome.record_failure(session.id().to_string(), &error),
            }
        }
        for (parent_id, children) in unlink {
            if !removed.contains(&parent_id) {
                self.unlink_children(parent_id, &children).await;
            }
        }
        Ok(outcome)
    }

    /// Drops `children` from the listing of `parent_id`. A failed rewrite
    /// leaves stale entries for [`Self::reconcile_hierarchy`].
    async fn unlink_children(&self, parent_id: SessionId, children: &[SessionId]) {
        let mut parent = match self.repository.find_by_id(parent_id).await {
            Ok(Some(parent)) => parent,
            Ok(None) => return,
            Err(error) => {
                warn!(%parent_id, %error, "parent listing not updated after removal");
                return;
            }
        };
        let kept: Vec<SessionId> = parent
            .child_session_ids()
            .iter()
            .copied()
            .filter(|child| !children.contains(child))
            .collect();
        if kept.len() == parent.child_session_ids().len() {
            return;
        }
        parent.set_children(kept, &*self.clock);
        if let Err(error) = self.repository.update(&parent).await {
            warn!(%parent_id, %error, "parent listing not updated after removal");
        }
    }
}
