use super::*;
use crate::revision::Revision;
use crate::step::Direction;
use std::collections::BTreeSet;

fn diamond() -> RevisionGraph {
    RevisionGraph::build(vec![
        Revision::base("a"),
        Revision::new("b1", "a"),
        Revision::new("b2", "a"),
        Revision::merge("m", ["b1", "b2"]),
    ])
    .unwrap()
}

fn heads(ids: &[&str]) -> BTreeSet<RevisionId> {
    ids.iter().map(|id| RevisionId::new(*id)).collect()
}

fn apply_ids(steps: &[Step]) -> Vec<String> {
    steps
        .iter()
        .filter_map(|s| s.revision().map(|r| r.to_string()))
        .collect()
}

/// Replay a plan against an in-memory head set, mirroring the runner's
/// bookkeeping, so round-trip properties can be checked without a database.
fn replay(graph: &RevisionGraph, current: &mut BTreeSet<RevisionId>, steps: &[Step]) {
    use crate::step::{classify_transition, HeadsTransition};
    for step in steps {
        match step {
            Step::Apply {
                revision,
                direction,
            } => {
                let rev = graph.get(revision.as_str()).unwrap();
                match classify_transition(graph, current, rev, *direction) {
                    HeadsTransition::NewBranch { insert } => {
                        current.insert(insert);
                    }
                    HeadsTransition::DeleteBranch { delete } => {
                        current.remove(delete.as_str());
                    }
                    HeadsTransition::Merge { update, delete } => {
                        current.remove(update.0.as_str());
                        current.insert(update.1);
                        for d in delete {
                            current.remove(d.as_str());
                        }
                    }
                    HeadsTransition::Unmerge { update, insert } => {
                        current.remove(update.0.as_str());
                        current.insert(update.1);
                        current.extend(insert);
                    }
                    HeadsTransition::Update { old, new } => {
                        current.remove(old.as_str());
                        current.insert(new);
                    }
                }
            }
            Step::Stamp { from, to, .. } => {
                for f in from {
                    current.remove(f.as_str());
                }
                current.extend(to.iter().cloned());
            }
        }
    }
}

#[test]
fn test_upgrade_from_base() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_upgrade("m", &heads(&[])).unwrap();
    let order = apply_ids(&steps);

    assert_eq!(order.len(), 4);
    assert_eq!(order.first().map(String::as_str), Some("a"));
    assert_eq!(order.last().map(String::as_str), Some("m"));
    assert!(steps.iter().all(|s| s.direction() == Direction::Up));
}

#[test]
fn test_upgrade_partial() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_upgrade("m", &heads(&["b1"])).unwrap();
    let order = apply_ids(&steps);
    assert_eq!(order, vec!["b2".to_string(), "m".to_string()]);
}

#[test]
fn test_upgrade_idempotent() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);

    let mut current = heads(&[]);
    let steps = planner.plan_upgrade("m", &current).unwrap();
    replay(&graph, &mut current, &steps);
    assert_eq!(current, heads(&["m"]));

    let again = planner.plan_upgrade("m", &current).unwrap();
    assert!(again.is_empty());
}

#[test]
fn test_upgrade_downgrade_round_trip() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);

    let mut current = heads(&[]);
    let up = planner.plan_upgrade("m", &current).unwrap();
    replay(&graph, &mut current, &up);
    let after_first = current.clone();

    let down = planner.plan_downgrade("base", &current).unwrap();
    replay(&graph, &mut current, &down);
    assert!(current.is_empty());

    let up = planner.plan_upgrade("m", &current).unwrap();
    replay(&graph, &mut current, &up);
    assert_eq!(current, after_first);
}

#[test]
fn test_downgrade_is_newest_first() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_downgrade("base", &heads(&["m"])).unwrap();
    let order = apply_ids(&steps);

    assert_eq!(order.len(), 4);
    assert_eq!(order.first().map(String::as_str), Some("m"));
    assert_eq!(order.last().map(String::as_str), Some("a"));
    assert!(steps.iter().all(|s| s.direction() == Direction::Down));
}

#[test]
fn test_downgrade_to_branch_sibling_keeps_other_branch() {
    // Downgrading to b1 from the merge only unwinds m; b2 is not a
    // descendant of b1 and stays applied.
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_downgrade("b1", &heads(&["m"])).unwrap();
    assert_eq!(apply_ids(&steps), vec!["m".to_string()]);

    let mut current = heads(&["m"]);
    replay(&graph, &mut current, &steps);
    assert_eq!(current, heads(&["b1", "b2"]));
}

#[test]
fn test_downgrade_target_not_applied() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let err = planner.plan_downgrade("m", &heads(&["b1"])).unwrap_err();
    assert!(matches!(err, CoreError::RangeNotAncestor { .. }));
}

#[test]
fn test_downgrade_spares_dependency_only_siblings() {
    // y2 depends on b2 but lives in its own history; downgrading to b2
    // must not unwind it.
    let graph = RevisionGraph::build(vec![
        Revision::base("a1"),
        Revision::new("b2", "a1"),
        Revision::new("c3", "b2"),
        Revision::base("x1"),
        Revision::new("y2", "x1").with_dependency("b2"),
    ])
    .unwrap();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_downgrade("b2", &heads(&["c3", "y2"])).unwrap();
    assert_eq!(apply_ids(&steps), vec!["c3".to_string()]);
}

#[test]
fn test_downgrade_unwinds_dependents_of_removed_revisions() {
    // Downgrading to a1 removes b2, so y2 (which depends on b2) must be
    // unwound as well, before b2.
    let graph = RevisionGraph::build(vec![
        Revision::base("a1"),
        Revision::new("b2", "a1"),
        Revision::base("x1"),
        Revision::new("y2", "x1").with_dependency("b2"),
    ])
    .unwrap();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_downgrade("a1", &heads(&["b2", "y2"])).unwrap();
    let order = apply_ids(&steps);
    let pos = |id: &str| order.iter().position(|s| s == id).unwrap();
    assert!(order.contains(&"y2".to_string()));
    assert!(pos("y2") < pos("b2"));
}

#[test]
fn test_stamp_merge_is_single_step() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_stamp("m", &heads(&["b1", "b2"])).unwrap();

    assert_eq!(steps.len(), 1);
    match &steps[0] {
        Step::Stamp {
            from,
            to,
            direction,
            branch_move,
        } => {
            assert_eq!(*from, heads(&["b1", "b2"]));
            assert_eq!(*to, heads(&["m"]));
            assert_eq!(*direction, Direction::Up);
            assert!(!*branch_move);
        }
        other => panic!("expected stamp, got {other:?}"),
    }
}

#[test]
fn test_stamp_to_base_deletes_all() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_stamp("base", &heads(&["b1", "b2"])).unwrap();
    assert_eq!(steps.len(), 1);
    match &steps[0] {
        Step::Stamp { from, to, direction, .. } => {
            assert_eq!(*from, heads(&["b1", "b2"]));
            assert!(to.is_empty());
            assert_eq!(*direction, Direction::Down);
        }
        other => panic!("expected stamp, got {other:?}"),
    }
}

#[test]
fn test_stamp_branch_move() {
    let graph = RevisionGraph::build(vec![
        Revision::base("a1"),
        Revision::new("b2", "a1"),
        Revision::base("x1"),
    ])
    .unwrap();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_stamp("x1", &heads(&["b2"])).unwrap();
    assert_eq!(steps.len(), 1);
    match &steps[0] {
        Step::Stamp {
            from, branch_move, ..
        } => {
            assert!(from.is_empty());
            assert!(*branch_move);
        }
        other => panic!("expected stamp, got {other:?}"),
    }
}

#[test]
fn test_stamp_downgrade_direction() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_stamp("a", &heads(&["m"])).unwrap();
    assert_eq!(steps.len(), 1);
    match &steps[0] {
        Step::Stamp { direction, .. } => assert_eq!(*direction, Direction::Down),
        other => panic!("expected stamp, got {other:?}"),
    }
}

#[test]
fn test_stamp_to_multiple_heads_tracks_consumed() {
    // Stamping both branch heads from a: the first stamp consumes a, the
    // second must not reference it again.
    let graph = RevisionGraph::build(vec![
        Revision::base("a"),
        Revision::new("b1", "a"),
        Revision::new("b2", "a"),
    ])
    .unwrap();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_stamp("heads", &heads(&["a"])).unwrap();
    assert_eq!(steps.len(), 2);

    match (&steps[0], &steps[1]) {
        (
            Step::Stamp {
                from: f0,
                branch_move: m0,
                ..
            },
            Step::Stamp {
                from: f1,
                branch_move: m1,
                ..
            },
        ) => {
            assert_eq!(*f0, heads(&["a"]));
            assert!(!*m0);
            assert!(f1.is_empty());
            assert!(*m1);
        }
        other => panic!("expected two stamps, got {other:?}"),
    }

    let mut current = heads(&["a"]);
    replay(&graph, &mut current, &steps);
    assert_eq!(current, heads(&["b1", "b2"]));
}

#[test]
fn test_stamp_already_there_is_empty() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    assert!(planner.plan_stamp("m", &heads(&["m"])).unwrap().is_empty());
    assert!(planner.plan_stamp("base", &heads(&[])).unwrap().is_empty());
}

#[test]
fn test_plan_with_unknown_current_head() {
    let graph = diamond();
    let planner = PathPlanner::new(&graph);
    let err = planner.plan_upgrade("m", &heads(&["ghost"])).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

#[test]
fn test_upgrade_orders_dependencies_first() {
    let graph = RevisionGraph::build(vec![
        Revision::base("a1"),
        Revision::new("b2", "a1"),
        Revision::base("x1"),
        Revision::new("y2", "x1").with_dependency("b2"),
    ])
    .unwrap();
    let planner = PathPlanner::new(&graph);
    let steps = planner.plan_upgrade("heads", &heads(&[])).unwrap();
    let order = apply_ids(&steps);
    let pos = |id: &str| order.iter().position(|s| s == id).unwrap();
    assert!(pos("b2") < pos("y2"));
}
