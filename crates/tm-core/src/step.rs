//! Planned units of work and head-set transition classification.
//!
//! `Step` is a closed union: the runner matches on it directly, there is no
//! runtime dispatch registry. `classify_transition` is the one place that
//! decides how a step moves the recorded head set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::graph::RevisionGraph;
use crate::revision::Revision;
use crate::revision_id::RevisionId;

/// Direction of travel through the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One planned unit of work, in the exact order it must execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Invoke the revision's upgrade or downgrade callback, then move the
    /// recorded heads.
    Apply {
        revision: RevisionId,
        direction: Direction,
    },
    /// Move the recorded heads without invoking any callback.
    Stamp {
        from: BTreeSet<RevisionId>,
        to: BTreeSet<RevisionId>,
        direction: Direction,
        /// True when the stamp lands on a branch sharing no history with
        /// the current heads.
        branch_move: bool,
    },
}

impl Step {
    /// Shorthand for an upgrade apply step.
    pub fn apply_up(revision: impl Into<RevisionId>) -> Self {
        Step::Apply {
            revision: revision.into(),
            direction: Direction::Up,
        }
    }

    /// Shorthand for a downgrade apply step.
    pub fn apply_down(revision: impl Into<RevisionId>) -> Self {
        Step::Apply {
            revision: revision.into(),
            direction: Direction::Down,
        }
    }

    /// The revision an apply step targets, if this is one.
    pub fn revision(&self) -> Option<&RevisionId> {
        match self {
            Step::Apply { revision, .. } => Some(revision),
            Step::Stamp { .. } => None,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Step::Apply { direction, .. } | Step::Stamp { direction, .. } => *direction,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Apply {
                revision,
                direction,
            } => write!(f, "{direction} {revision}"),
            Step::Stamp { from, to, .. } => {
                let from: Vec<&str> = from.iter().map(|id| id.as_str()).collect();
                let to: Vec<&str> = to.iter().map(|id| id.as_str()).collect();
                write!(f, "stamp [{}] -> [{}]", from.join(", "), to.join(", "))
            }
        }
    }
}

/// How a single applied revision moves the recorded head set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadsTransition {
    /// Insert a brand-new head: a base revision, or a sibling branch whose
    /// parent was already consumed by another branch.
    NewBranch { insert: RevisionId },
    /// Remove a head without a replacement: downgrading a base, or a
    /// revision whose predecessors are still covered by other heads.
    DeleteBranch { delete: RevisionId },
    /// Several heads collapse into one merge revision: `update` replaces
    /// one consumed head, `delete` removes the rest.
    Merge {
        update: (RevisionId, RevisionId),
        delete: Vec<RevisionId>,
    },
    /// A merge revision expands back into several heads: `update` replaces
    /// it with one predecessor, `insert` adds the rest.
    Unmerge {
        update: (RevisionId, RevisionId),
        insert: Vec<RevisionId>,
    },
    /// One head replaces another in place.
    Update { old: RevisionId, new: RevisionId },
}

/// Classify how applying `revision` in `direction` moves `current`.
///
/// Upgrade: every down-revision that is a current head is consumed; none
/// consumed means the revision starts a new branch (its parent either does
/// not exist or was already consumed by a sibling).
///
/// Downgrade: each down-revision becomes a head again unless another
/// current head still descends from it along versioned edges; none needed
/// means the head is deleted outright.
pub fn classify_transition(
    graph: &RevisionGraph,
    current: &BTreeSet<RevisionId>,
    revision: &Revision,
    direction: Direction,
) -> HeadsTransition {
    match direction {
        Direction::Up => {
            let consumed: Vec<RevisionId> = revision
                .down_revisions
                .iter()
                .filter(|d| current.contains(d.as_str()))
                .cloned()
                .collect();
            match consumed.len() {
                0 => HeadsTransition::NewBranch {
                    insert: revision.id.clone(),
                },
                1 => HeadsTransition::Update {
                    old: consumed[0].clone(),
                    new: revision.id.clone(),
                },
                _ => {
                    let mut consumed = consumed;
                    let first = consumed.remove(0);
                    HeadsTransition::Merge {
                        update: (first, revision.id.clone()),
                        delete: consumed,
                    }
                }
            }
        }
        Direction::Down => {
            let others: BTreeSet<&RevisionId> = current
                .iter()
                .filter(|h| *h != &revision.id)
                .collect();
            let needed: Vec<RevisionId> = revision
                .down_revisions
                .iter()
                .filter(|d| {
                    !others.iter().any(|h| {
                        h == d || graph.ancestors([*h], false).contains(d.as_str())
                    })
                })
                .cloned()
                .collect();
            match needed.len() {
                0 => HeadsTransition::DeleteBranch {
                    delete: revision.id.clone(),
                },
                1 => HeadsTransition::Update {
                    old: revision.id.clone(),
                    new: needed[0].clone(),
                },
                _ => {
                    let mut needed = needed;
                    let first = needed.remove(0);
                    HeadsTransition::Unmerge {
                        update: (revision.id.clone(), first),
                        insert: needed,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "step_test.rs"]
mod tests;
