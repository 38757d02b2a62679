//! Path planning: turn a target reference and the current heads into an
//! ordered step list.

use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};
use crate::graph::{join_ids, RevisionGraph};
use crate::revision_id::RevisionId;
use crate::step::{Direction, Step};

/// Computes the ordered [`Step`] list needed to go from a current-heads set
/// to a target reference.
///
/// The planner only reads the graph; it never touches the database. Steps
/// come out in the exact order they must execute and the runner never
/// re-derives it.
#[derive(Debug)]
pub struct PathPlanner<'g> {
    graph: &'g RevisionGraph,
}

impl<'g> PathPlanner<'g> {
    pub fn new(graph: &'g RevisionGraph) -> Self {
        Self { graph }
    }

    /// One upgrade apply step per revision between `current` and `target`,
    /// oldest dependency first.
    pub fn plan_upgrade(
        &self,
        target: &str,
        current: &BTreeSet<RevisionId>,
    ) -> CoreResult<Vec<Step>> {
        self.validate_current(current)?;
        let targets = self.graph.resolve_ids(target)?;

        let applied = self.closure(current);
        let wanted = self.closure(&targets);
        let todo: BTreeSet<RevisionId> = wanted.difference(&applied).cloned().collect();

        let order = self.graph.topo_sort_range(&todo)?;
        log::debug!(
            "upgrade plan to '{}': {} step(s) from {} head(s)",
            target,
            order.len(),
            current.len()
        );
        Ok(order
            .into_iter()
            .map(|rev| Step::apply_up(rev.id.clone()))
            .collect())
    }

    /// One downgrade apply step per revision above `target`, newest first.
    ///
    /// Only versioned descendants of the target seed the removal set, so a
    /// sibling branch connected by a dependency edge alone is not unwound;
    /// the seeds are then closed over forward edges so anything depending
    /// on a removed revision is removed with it.
    pub fn plan_downgrade(
        &self,
        target: &str,
        current: &BTreeSet<RevisionId>,
    ) -> CoreResult<Vec<Step>> {
        self.validate_current(current)?;
        let targets = self.graph.resolve_ids(target)?;

        let applied = self.closure(current);
        for t in &targets {
            if !applied.contains(t) {
                return Err(CoreError::RangeNotAncestor {
                    lower: t.to_string(),
                    upper: join_ids(current),
                });
            }
        }

        let keep = self.closure(&targets);
        let remove: BTreeSet<RevisionId> = if targets.is_empty() {
            applied
        } else {
            let seeds: BTreeSet<RevisionId> = self
                .graph
                .descendants(targets.iter(), false)
                .into_iter()
                .filter(|id| applied.contains(id) && !keep.contains(id))
                .collect();
            let mut remove = self.graph.descendants(seeds.iter(), true);
            remove.extend(seeds);
            remove.retain(|id| applied.contains(id) && !keep.contains(id));
            remove
        };

        let mut order = self.graph.topo_sort_range(&remove)?;
        order.reverse();
        log::debug!(
            "downgrade plan to '{}': {} step(s) from {} head(s)",
            target,
            order.len(),
            current.len()
        );
        Ok(order
            .into_iter()
            .map(|rev| Step::apply_down(rev.id.clone()))
            .collect())
    }

    /// The minimal stamp steps moving the recorded heads to `target`
    /// without invoking any apply callback.
    pub fn plan_stamp(
        &self,
        target: &str,
        current: &BTreeSet<RevisionId>,
    ) -> CoreResult<Vec<Step>> {
        self.validate_current(current)?;
        let targets = self.graph.resolve_ids(target)?;

        // Stamping to base deletes every recorded branch.
        if targets.is_empty() {
            if current.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![Step::Stamp {
                from: current.clone(),
                to: BTreeSet::new(),
                direction: Direction::Down,
                branch_move: false,
            }]);
        }

        // Later steps must see the heads earlier steps already consumed.
        let mut cur = current.clone();
        let mut steps = Vec::new();
        for t in &targets {
            if cur.contains(t) {
                continue;
            }
            let mut lineage = self.graph.ancestors([t], true);
            lineage.extend(self.graph.descendants([t], true));

            let from: BTreeSet<RevisionId> = cur.intersection(&lineage).cloned().collect();
            let moving_up = from
                .iter()
                .any(|h| self.graph.descendants([h], true).contains(t.as_str()));

            for consumed in &from {
                cur.remove(consumed.as_str());
            }
            cur.insert(t.clone());

            if from.is_empty() {
                // No shared history with any current head: a branch move.
                steps.push(Step::Stamp {
                    from: BTreeSet::new(),
                    to: BTreeSet::from([t.clone()]),
                    direction: Direction::Up,
                    branch_move: true,
                });
            } else {
                steps.push(Step::Stamp {
                    from,
                    to: BTreeSet::from([t.clone()]),
                    direction: if moving_up {
                        Direction::Up
                    } else {
                        Direction::Down
                    },
                    branch_move: false,
                });
            }
        }
        Ok(steps)
    }

    /// Reachability closure of a head set: the ids plus everything upstream
    /// of them over versioned and dependency edges.
    fn closure(&self, ids: &BTreeSet<RevisionId>) -> BTreeSet<RevisionId> {
        let mut closure = self.graph.ancestors(ids.iter(), true);
        closure.extend(ids.iter().cloned());
        closure
    }

    /// Every recorded head must exist in the graph; a miss means the
    /// persisted state refers to history this graph does not know.
    fn validate_current(&self, current: &BTreeSet<RevisionId>) -> CoreResult<()> {
        for id in current {
            if !self.graph.contains(id.as_str()) {
                return Err(CoreError::NotFound {
                    reference: id.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
