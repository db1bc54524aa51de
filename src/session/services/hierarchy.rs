//! Read-only navigation over the session hierarchy and listing repair.
//!
//! Queries scan the orchestration once and answer from a [`SessionIndex`].

use super::lifecycle::{SessionService, SessionServiceError, SessionServiceResult};
use crate::OrchestrationId;
use crate::session::{
    domain::{
        Breadcrumb, HierarchyRepair, NavigationHistory, RelatedSessions, Session, SessionId,
        SessionIndex, SessionSummary,
    },
    ports::SessionRepository,
};
use mockable::Clock;
use tracing::info;

impl<R, C> SessionService<R, C>
where
    R: SessionRepository,
    C: Clock + Send + Sync,
{
    async fn orchestration_of(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<Vec<Session>> {
        let session = self.require(session_id).await?;
        Ok(self
            .repository
            .find_by_orchestration(session.orchestration_id())
            .await?)
    }

    /// Returns the path from the root ancestor down to the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Repository`] when the scan fails.
    pub async fn get_session_chain(&self, session_id: SessionId) -> SessionServiceResult<Vec<Session>> {
        let sessions = self.orchestration_of(session_id).await?;
        let index = SessionIndex::build(&sessions);
        let chain = index
            .chain(session_id)
            .ok_or(SessionServiceError::NotFound(session_id))?;
        Ok(chain.into_iter().cloned().collect())
    }

    /// Collects the parent, children, siblings and chronological neighbours
    /// of a session together with any hierarchy drift around it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Repository`] when the scan fails.
    pub async fn find_related_sessions(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<RelatedSessions> {
        let sessions = self.orchestration_of(session_id).await?;
        SessionIndex::build(&sessions)
            .related(session_id)
            .ok_or(SessionServiceError::NotFound(session_id))
    }

    /// Returns the breadcrumbs from the root ancestor down to the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Repository`] when the scan fails.
    pub async fn get_session_breadcrumbs(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<Vec<Breadcrumb>> {
        let sessions = self.orchestration_of(session_id).await?;
        SessionIndex::build(&sessions)
            .breadcrumbs(session_id)
            .ok_or(SessionServiceError::NotFound(session_id))
    }

    /// Returns the timeline and hierarchy forest of an orchestration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the scan fails.
    pub async fn get_session_navigation_history(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionServiceResult<NavigationHistory> {
        let sessions = self
            .repository
            .find_by_orchestration(orchestration_id)
            .await?;
        Ok(SessionIndex::build(&sessions).navigation_history())
    }

    /// Summarizes the parent of a session.
    ///
    /// Returns `None` for a root session or a parent that no longer exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Repository`] when a lookup fails.
    pub async fn parent_context(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<Option<SessionSummary>> {
        let session = self.require(session_id).await?;
        let Some(parent_id) = session.parent_session_id() else {
            return Ok(None);
        };
        Ok(self.repository.find_summary(parent_id).await?)
    }

    /// Summarizes the listed children of a session in listing order.
    ///
    /// Listed children that no longer exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::NotFound`] for an unknown session and
    /// [`SessionServiceError::Repository`] when a lookup fails.
    pub async fn child_contexts(
        &self,
        session_id: SessionId,
    ) -> SessionServiceResult<Vec<SessionSummary>> {
        let session = self.require(session_id).await?;
        let mut summaries = Vec::with_capacity(session.child_session_ids().len());
        for child in session.child_session_ids() {
            if let Some(summary) = self.repository.find_summary(*child).await? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    /// Rewrites every parent's child listing to match its children's parent
    /// pointers.
    ///
    /// # Errors
    ///
    /// Returns [`SessionServiceError::Repository`] when the scan or a write
    /// fails. Listings written before the failure stay written.
    pub async fn reconcile_hierarchy(
        &self,
        orchestration_id: &OrchestrationId,
    ) -> SessionServiceResult<HierarchyRepair> {
        let sessions = self
            .repository
            .find_by_orchestration(orchestration_id)
            .await?;
        let index = SessionIndex::build(&sessions);
        let mut repair = HierarchyRepair::default();
        for fix in index.listing_fixes() {
            let Some(parent) = index.get(fix.parent) else {
                continue;
            };
            let mut updated = parent.clone();
            updated.set_children(fix.children, &*self.clock);
            self.repository.update(&updated).await?;
            repair.updated_parents.push(fix.parent);
            repair.added_links += fix.added;
            repair.removed_links += fix.removed;
        }
        info!(
            orchestration_id = %orchestration_id,
            updated_parents = repair.updated_parents.len(),
            added_links = repair.added_links,
            removed_links = repair.removed_links,
            "session hierarchy reconciled"
        );
        Ok(repair)
    }
}
