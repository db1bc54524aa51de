//! Unit tests for the session hierarchy index.

use super::{Seed, orchestration};
use crate::session::domain::{HierarchyIssue, Session, SessionId, SessionIndex, SessionState};
use eyre::{OptionExt, ensure};
use rstest::{fixture, rstest};

/// Root with two children; the second child has one grandchild. Listings
/// agree with parent pointers.
struct Family {
    sessions: Vec<Session>,
    root: SessionId,
    first: SessionId,
    second: SessionId,
    grandchild: SessionId,
}

#[fixture]
fn family() -> Family {
    let orchestration_id = orchestration("orch-family");
    let root = SessionId::new();
    let first = SessionId::new();
    let second = SessionId::new();
    let grandchild = SessionId::new();
    let sessions = vec![
        Seed {
            id: root,
            ..Seed::new(0)
        }
        .listing(&[first, second])
        .build(&orchestration_id),
        Seed {
            id: first,
            ..Seed::new(1)
        }
        .under(root)
        .in_state(SessionState::Completed)
        .build(&orchestration_id),
        Seed {
            id: second,
            ..Seed::new(5)
        }
        .under(root)
        .listing(&[grandchild])
        .build(&orchestration_id),
        Seed {
            id: grandchild,
            ..Seed::new(6)
        }
        .under(second)
        .build(&orchestration_id),
    ];
    Family {
        sessions,
        root,
        first,
        second,
        grandchild,
    }
}

fn ids(sessions: &[Session]) -> Vec<SessionId> {
    sessions.iter().map(Session::id).collect()
}

#[rstest]
fn chain_runs_from_root_to_node(family: Family) -> eyre::Result<()> {
    let index = SessionIndex::build(&family.sessions);

    let chain = index
        .chain(family.grandchild)
        .ok_or_eyre("grandchild should be indexed")?;

    let chain_ids: Vec<SessionId> = chain.iter().map(|session| session.id()).collect();
    ensure!(chain_ids == [family.root, family.second, family.grandchild]);
    ensure!(index.chain(SessionId::new()).is_none());
    Ok(())
}

#[rstest]
fn breadcrumbs_carry_names_and_states(family: Family) -> eyre::Result<()> {
    let index = SessionIndex::build(&family.sessions);

    let crumbs = index
        .breadcrumbs(family.second)
        .ok_or_eyre("second child should be indexed")?;

    let names: Vec<&str> = crumbs.iter().map(|crumb| crumb.name.as_str()).collect();
    ensure!(names == ["session 0", "session 5"]);
    ensure!(crumbs.iter().all(|crumb| crumb.state == SessionState::Active));
    Ok(())
}

#[rstest]
fn related_sessions_of_a_middle_node(family: Family) -> eyre::Result<()> {
    let index = SessionIndex::build(&family.sessions);

    let related = index
        .related(family.second)
        .ok_or_eyre("second child should be indexed")?;

    ensure!(related.parent.as_ref().map(Session::id) == Some(family.root));
    ensure!(ids(&related.children) == [family.grandchild]);
    ensure!(ids(&related.siblings) == [family.first]);
    ensure!(ids(&related.completed_before) == [family.first]);
    ensure!(ids(&related.started_after) == [family.grandchild]);
    ensure!(related.issues.is_empty());
    Ok(())
}

#[rstest]
fn consistent_family_has_no_issues_or_fixes(family: Family) {
    let index = SessionIndex::build(&family.sessions);

    assert!(index.issues().is_empty());
    assert!(index.listing_fixes().is_empty());
}

#[rstest]
fn drifted_listings_are_reported_and_planned() -> eyre::Result<()> {
    let orchestration_id = orchestration("orch-drift");
    let parent = SessionId::new();
    let unlisted = SessionId::new();
    let listed = SessionId::new();
    let stale = SessionId::new();
    let missing_parent = SessionId::new();
    let sessions = vec![
        Seed {
            id: parent,
            ..Seed::new(0)
        }
        .listing(&[stale, listed])
        .build(&orchestration_id),
        Seed {
            id: listed,
            ..Seed::new(1)
        }
        .under(parent)
        .build(&orchestration_id),
        Seed {
            id: unlisted,
            ..Seed::new(2)
        }
        .under(parent)
        .build(&orchestration_id),
        Seed {
            id: stale,
            ..Seed::new(3)
        }
        .build(&orchestration_id),
        Seed::new(4).under(missing_parent).build(&orchestration_id),
    ];
    let index = SessionIndex::build(&sessions);

    let issues = index.issues();
    ensure!(issues.contains(&HierarchyIssue::UnlistedChild {
        parent,
        child: unlisted
    }));
    ensure!(issues.contains(&HierarchyIssue::StaleChildLink {
        parent,
        child: stale
    }));
    ensure!(
        issues
            .iter()
            .any(|issue| matches!(issue, HierarchyIssue::MissingParent { parent: p, .. } if *p == missing_parent))
    );

    let fixes = index.listing_fixes();
    let fix = fixes.first().ok_or_eyre("parent listing should be fixed")?;
    ensure!(fixes.len() == 1);
    ensure!(fix.parent == parent);
    ensure!(fix.children == [listed, unlisted]);
    ensure!(fix.added == 1);
    ensure!(fix.removed == 1);

    let related = index
        .related(unlisted)
        .ok_or_eyre("unlisted child should be indexed")?;
    ensure!(related.issues.len() == 1);
    Ok(())
}

#[rstest]
fn navigation_history_orders_timeline_and_builds_forest(family: Family) -> eyre::Result<()> {
    let orchestration_id = orchestration("orch-family");
    let mut sessions = family.sessions;
    let orphan = Seed::new(3)
        .under(SessionId::new())
        .build(&orchestration_id);
    let orphan_id = orphan.id();
    sessions.push(orphan);
    sessions.reverse();
    let index = SessionIndex::build(&sessions);

    let history = index.navigation_history();

    let timeline: Vec<SessionId> = history.timeline.iter().map(|entry| entry.id).collect();
    ensure!(
        timeline
            == [
                family.root,
                family.first,
                orphan_id,
                family.second,
                family.grandchild
            ]
    );
    let roots: Vec<SessionId> = history.hierarchy.iter().map(|node| node.id).collect();
    ensure!(roots == [family.root, orphan_id]);
    let root = history.hierarchy.first().ok_or_eyre("root node")?;
    let children: Vec<SessionId> = root.children.iter().map(|node| node.id).collect();
    ensure!(children == [family.first, family.second]);
    let second = root.children.get(1).ok_or_eyre("second child node")?;
    ensure!(second.children.len() == 1);
    Ok(())
}

#[rstest]
fn deep_hierarchies_nest_one_level_per_generation() -> eyre::Result<()> {
    const DEPTH: i64 = 2_000;
    let orchestration_id = orchestration("orch-deep");
    let mut sessions = vec![Seed::new(0).build(&orchestration_id)];
    for position in 1..DEPTH {
        let parent = sessions.last().map(Session::id).ok_or_eyre("parent session")?;
        sessions.push(Seed::new(position).under(parent).build(&orchestration_id));
    }
    let index = SessionIndex::build(&sessions);

    let history = index.navigation_history();

    ensure!(history.hierarchy.len() == 1);
    let mut node = history.hierarchy.first().ok_or_eyre("root node")?;
    for session in sessions.iter().skip(1) {
        let [child] = node.children.as_slice() else {
            eyre::bail!("every generation has exactly one child");
        };
        ensure!(child.id == session.id());
        node = child;
    }
    ensure!(node.children.is_empty());
    Ok(())
}

#[rstest]
fn pointer_cycles_do_not_loop() -> eyre::Result<()> {
    let orchestration_id = orchestration("orch-loop");
    let a = SessionId::new();
    let b = SessionId::new();
    let sessions = vec![
        Seed { id: a, ..Seed::new(0) }.under(b).build(&orchestration_id),
        Seed { id: b, ..Seed::new(1) }.under(a).build(&orchestration_id),
    ];
    let index = SessionIndex::build(&sessions);

    let chain = index.chain(a).ok_or_eyre("a should be indexed")?;
    ensure!(chain.len() == 2);
    let history = index.navigation_history();
    ensure!(history.hierarchy.len() == 1);
    ensure!(history.timeline.len() == 2);
    Ok(())
}
