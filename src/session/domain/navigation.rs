//! In-memory index over the sessions of one orchestration.
//!
//! Parent pointers (`parent_session_id`) are authoritative. Child listings
//! are a denormalized copy that can drift when a two-record update is
//! interrupted; the index reports such drift as [`HierarchyIssue`]s and
//! computes the listing each parent should carry.

use super::{Session, SessionId, SessionState, SessionType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Disagreement between parent pointers and child listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum HierarchyIssue {
    /// `child` points at `parent`, which does not list it.
    UnlistedChild {
        /// Parent session.
        parent: SessionId,
        /// Child session.
        child: SessionId,
    },
    /// `parent` lists `child`, which is missing or points elsewhere.
    StaleChildLink {
        /// Parent session.
        parent: SessionId,
        /// Listed child.
        child: SessionId,
    },
    /// `child` points at a parent that does not exist.
    MissingParent {
        /// Child session.
        child: SessionId,
        /// Unresolvable parent.
        parent: SessionId,
    },
}

/// Sessions related to one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSessions {
    /// Parent, when it resolves.
    pub parent: Option<Session>,
    /// Sessions pointing at this one, oldest first.
    pub children: Vec<Session>,
    /// Other children of the same parent, oldest first.
    pub siblings: Vec<Session>,
    /// Sessions that finished before this one started.
    pub completed_before: Vec<Session>,
    /// Sessions created after this one.
    pub started_after: Vec<Session>,
    /// Drift involving this session as parent or child.
    pub issues: Vec<HierarchyIssue>,
}

/// One step of a root-to-node path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    /// Session identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Workflow phase.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Lifecycle state.
    pub state: SessionState,
}

impl Breadcrumb {
    fn of(session: &Session) -> Self {
        Self {
            id: session.id(),
            name: session.display_name().to_owned(),
            session_type: session.session_type(),
            state: session.state(),
        }
    }
}

/// Timeline entry of the navigation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// Session identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Workflow phase.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Lifecycle state.
    pub state: SessionState,
    /// Start time.
    pub created_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Node of the hierarchy forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    /// Session identifier.
    pub id: SessionId,
    /// Display name.
    pub name: String,
    /// Workflow phase.
    #[serde(rename = "type")]
    pub session_type: SessionType,
    /// Lifecycle state.
    pub state: SessionState,
    /// Children, oldest first.
    pub children: Vec<HierarchyNode>,
}

/// Chronological and structural view of an orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationHistory {
    /// Every session by start time.
    pub timeline: Vec<TimelineEntry>,
    /// Forest rooted at sessions without a resolvable parent.
    pub hierarchy: Vec<HierarchyNode>,
}

/// Child listings rewritten by a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRepair {
    /// Parents whose listing changed.
    pub updated_parents: Vec<SessionId>,
    /// Children added to a listing.
    pub added_links: usize,
    /// Stale entries dropped from a listing.
    pub removed_links: usize,
}

impl HierarchyRepair {
    /// Returns `true` when nothing needed rewriting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updated_parents.is_empty()
    }
}

/// Planned rewrite of one parent's child listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFix {
    /// Parent to rewrite.
    pub parent: SessionId,
    /// Listing the parent should carry.
    pub children: Vec<SessionId>,
    /// Entries added.
    pub added: usize,
    /// Entries dropped.
    pub removed: usize,
}

/// Lookup structure over a snapshot of sessions.
#[derive(Debug)]
pub struct SessionIndex<'a> {
    ordered: Vec<&'a Session>,
    by_id: HashMap<SessionId, &'a Session>,
    children: HashMap<SessionId, Vec<SessionId>>,
}

impl<'a> SessionIndex<'a> {
    /// Indexes `sessions`, ordering them by creation time then identifier.
    #[must_use]
    pub fn build(sessions: &'a [Session]) -> Self {
        let mut ordered: Vec<&Session> = sessions.iter().collect();
        ordered.sort_by_key(|session| (session.created_at(), session.id()));
        let by_id = ordered
            .iter()
            .map(|session| (session.id(), *session))
            .collect::<HashMap<_, _>>();
        let mut children: HashMap<SessionId, Vec<SessionId>> = HashMap::new();
        for session in &ordered {
            if let Some(parent) = session.parent_session_id() {
                children.entry(parent).or_default().push(session.id());
            }
        }
        Self {
            ordered,
            by_id,
            children,
        }
    }

    /// Returns the indexed session.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&'a Session> {
        self.by_id.get(&id).copied()
    }

    /// Returns the sessions pointing at `id`, oldest first.
    #[must_use]
    pub fn children_of(&self, id: SessionId) -> Vec<&'a Session> {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.get(*child))
            .collect()
    }

    /// Returns the path from the root ancestor down to `id`.
    ///
    /// The walk stops at a missing parent or a pointer cycle. Returns `None`
    /// when `id` is not indexed.
    #[must_use]
    pub fn chain(&self, id: SessionId) -> Option<Vec<&'a Session>> {
        let mut current = self.get(id)?;
        let mut visited = HashSet::from([current.id()]);
        let mut path = vec![current];
        while let Some(parent) = current.parent_session_id().and_then(|parent_id| self.get(parent_id)) {
            if !visited.insert(parent.id()) {
                break;
            }
            path.push(parent);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Returns the breadcrumbs from the root ancestor down to `id`.
    #[must_use]
    pub fn breadcrumbs(&self, id: SessionId) -> Option<Vec<Breadcrumb>> {
        self.chain(id)
            .map(|path| path.into_iter().map(Breadcrumb::of).collect())
    }

    /// Collects the sessions related to `id`.
    #[must_use]
    pub fn related(&self, id: SessionId) -> Option<RelatedSessions> {
        let session = self.get(id)?;
        let parent = session.parent_session_id().and_then(|parent_id| self.get(parent_id));
        let siblings: Vec<Session> = parent
            .map(|resolved| {
                self.children_of(resolved.id())
                    .into_iter()
                    .filter(|sibling| sibling.id() != id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let mut completed_before: Vec<&Session> = self
            .ordered
            .iter()
            .copied()
            .filter(|other| other.id() != id)
            .filter(|other| {
                other
                    .completed_at()
                    .is_some_and(|finished| finished <= session.created_at())
            })
            .collect();
        completed_before.sort_by_key(|other| (other.completed_at(), other.id()));
        let started_after = self
            .ordered
            .iter()
            .copied()
            .filter(|other| other.created_at() > session.created_at())
            .cloned()
            .collect();

        let issues = self
            .issues()
            .into_iter()
            .filter(|issue| issue.involves(id))
            .collect();

        Some(RelatedSessions {
            parent: parent.cloned(),
            children: self.children_of(id).into_iter().cloned().collect(),
            siblings,
            completed_before: completed_before.into_iter().cloned().collect(),
            started_after,
            issues,
        })
    }

    /// Reports every disagreement between parent pointers and listings.
    #[must_use]
    pub fn issues(&self) -> Vec<HierarchyIssue> {
        let mut issues = Vec::new();
        for session in &self.ordered {
            let id = session.id();
            if let Some(parent_id) = session.parent_session_id() {
                match self.get(parent_id) {
                    Some(parent) if !parent.child_session_ids().contains(&id) => {
                        issues.push(HierarchyIssue::UnlistedChild {
                            parent: parent_id,
                            child: id,
                        });
                    }
                    Some(_) => {}
                    None => issues.push(HierarchyIssue::MissingParent {
                        child: id,
                        parent: parent_id,
                    }),
                }
            }
            for child in session.child_session_ids() {
                let points_back = self
                    .get(*child)
                    .is_some_and(|listed| listed.parent_session_id() == Some(id));
                if !points_back {
                    issues.push(HierarchyIssue::StaleChildLink {
                        parent: id,
                        child: *child,
                    });
                }
            }
        }
        issues
    }

    /// Plans the listing rewrites that make every parent agree with its
    /// children's pointers.
    ///
    /// Valid entries keep their order; unlisted children are appended by
    /// creation time.
    #[must_use]
    pub fn listing_fixes(&self) -> Vec<ListingFix> {
        let mut fixes = Vec::new();
        for parent in &self.ordered {
            let parent_id = parent.id();
            let actual = self.children.get(&parent_id).cloned().unwrap_or_default();
            let actual_set: HashSet<SessionId> = actual.iter().copied().collect();
            let mut seen = HashSet::new();
            let mut listing: Vec<SessionId> = parent
                .child_session_ids()
                .iter()
                .copied()
                .filter(|child| actual_set.contains(child) && seen.insert(*child))
                .collect();
            let removed = parent.child_session_ids().len() - listing.len();
            let before = listing.len();
            listing.extend(actual.into_iter().filter(|child| seen.insert(*child)));
            let added = listing.len() - before;
            if added > 0 || removed > 0 {
                fixes.push(ListingFix {
                    parent: parent_id,
                    children: listing,
                    added,
                    removed,
                });
            }
        }
        fixes
    }

    /// Builds the timeline and the hierarchy forest.
    #[must_use]
    pub fn navigation_history(&self) -> NavigationHistory {
        let timeline = self
            .ordered
            .iter()
            .map(|session| TimelineEntry {
                id: session.id(),
                name: session.display_name().to_owned(),
                session_type: session.session_type(),
                state: session.state(),
                created_at: session.created_at(),
                completed_at: session.completed_at(),
            })
            .collect();

        let mut visited = HashSet::new();
        let mut hierarchy = Vec::new();
        for &session in &self.ordered {
            let is_root = session
                .parent_session_id()
                .is_none_or(|parent| !self.by_id.contains_key(&parent));
            if is_root {
                hierarchy.push(self.node(session, &mut visited));
            }
        }
        for &session in &self.ordered {
            if !visited.contains(&session.id()) {
                hierarchy.push(self.node(session, &mut visited));
            }
        }
        NavigationHistory {
            timeline,
            hierarchy,
        }
    }

    /// Builds the subtree under `root` without recursion, skipping sessions
    /// already placed elsewhere in the forest.
    fn node(&self, root: &'a Session, visited: &mut HashSet<SessionId>) -> HierarchyNode {
        visited.insert(root.id());
        let mut ancestors: Vec<OpenNode<'a>> = Vec::new();
        let mut current = self.open(root);
        loop {
            if let Some(child) = current
                .pending
                .find(|child| !visited.contains(&child.id()))
            {
                visited.insert(child.id());
                ancestors.push(std::mem::replace(&mut current, self.open(child)));
                continue;
            }
            let node = current.close();
            match ancestors.pop() {
                Some(mut parent) => {
                    parent.children.push(node);
                    current = parent;
                }
                None => return node,
            }
        }
    }

    fn open(&self, session: &'a Session) -> OpenNode<'a> {
        OpenNode {
            session,
            pending: self.children_of(session.id()).into_iter(),
            children: Vec::new(),
        }
    }
}

/// Hierarchy node whose children are still being visited.
struct OpenNode<'a> {
    session: &'a Session,
    pending: std::vec::IntoIter<&'a Session>,
    children: Vec<HierarchyNode>,
}

impl OpenNode<'_> {
    fn close(self) -> HierarchyNode {
        HierarchyNode {
            id: self.session.id(),
            name: self.session.display_name().to_owned(),
            session_type: self.session.session_type(),
            state: self.session.state(),
            children: self.children,
        }
    }
}

impl HierarchyIssue {
    /// Returns `true` when `id` is either side of the issue.
    #[must_use]
    pub fn involves(&self, id: SessionId) -> bool {
        match *self {
            Self::UnlistedChild { parent, child }
            | Self::StaleChildLink { parent, child }
            | Self::MissingParent { child, parent } => parent == id || child == id,
        }
    }
}
