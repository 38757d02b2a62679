//! Ordered iteration over a revision range.
//!
//! Produces the single linearization every planner path is built from:
//! dependency-first (oldest first), depth-first within a branch and
//! breadth-first across sibling branches. A revision is never yielded
//! before all of its in-range predecessors.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CoreError, CoreResult};
use crate::graph::{join_ids, RevisionGraph};
use crate::revision::Revision;
use crate::revision_id::RevisionId;

impl RevisionGraph {
    /// Revisions between `lower` (exclusive unless `inclusive`) and `upper`
    /// (always included), in execution order for an upgrade.
    ///
    /// `upper` and `lower` accept the full reference grammar; `"base"` as
    /// the lower bound means the implicit position before any revision.
    /// Fails with `RangeNotAncestor` when `lower` does not lead to `upper`
    /// along any path.
    pub fn iterate(&self, upper: &str, lower: &str, inclusive: bool) -> CoreResult<Vec<&Revision>> {
        let uppers = self.resolve_ids(upper)?;
        let lowers = self.resolve_ids(lower)?;
        self.iterate_ids(&uppers, &lowers, inclusive)
    }

    /// [`iterate`](Self::iterate) over already-resolved bounds.
    pub(crate) fn iterate_ids(
        &self,
        uppers: &BTreeSet<RevisionId>,
        lowers: &BTreeSet<RevisionId>,
        inclusive: bool,
    ) -> CoreResult<Vec<&Revision>> {
        let mut range: BTreeSet<RevisionId> = self.ancestors(uppers.iter(), true);
        range.extend(uppers.iter().cloned());

        if !lowers.is_empty() {
            for low in lowers {
                let mut reach = self.descendants([low], true);
                reach.insert(low.clone());
                if reach.is_disjoint(uppers) {
                    return Err(CoreError::RangeNotAncestor {
                        lower: low.to_string(),
                        upper: join_ids(uppers),
                    });
                }
            }
            let mut keep: BTreeSet<RevisionId> = self.descendants(lowers.iter(), true);
            if inclusive {
                keep.extend(lowers.iter().cloned());
            }
            range.retain(|id| keep.contains(id));
        }

        self.topo_sort_range(&range)
    }

    /// The whole history, newest first, for `history`-style listings.
    pub fn walk_history(&self) -> CoreResult<Vec<&Revision>> {
        let uppers = self.heads().clone();
        let mut seq = self.iterate_ids(&uppers, &BTreeSet::new(), true)?;
        seq.reverse();
        Ok(seq)
    }

    /// Deterministic dependency-first ordering of `range`.
    ///
    /// Kahn's algorithm over the in-range edges with a stack of ready
    /// revisions: newly unblocked successors are processed before earlier
    /// siblings, which walks each branch depth-first; ties break by id.
    pub(crate) fn topo_sort_range(&self, range: &BTreeSet<RevisionId>) -> CoreResult<Vec<&Revision>> {
        let mut indegree: BTreeMap<&RevisionId, usize> = BTreeMap::new();
        for id in range {
            let rev = self.get(id).ok_or_else(|| CoreError::NotFound {
                reference: id.to_string(),
            })?;
            let preds: BTreeSet<&RevisionId> = rev
                .all_predecessors()
                .filter(|p| range.contains(p.as_str()))
                .collect();
            indegree.insert(id, preds.len());
        }

        let mut ready: Vec<&RevisionId> = indegree
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(id, _)| *id)
            .collect();
        // Sorted descending so the stack pops the smallest id first.
        ready.sort_unstable_by(|a, b| b.cmp(a));

        let mut out: Vec<&Revision> = Vec::with_capacity(range.len());
        while let Some(id) = ready.pop() {
            // Entries in `ready` always came from `range`, so the lookup
            // cannot fail past the indegree pass above.
            if let Some(rev) = self.get(id) {
                out.push(rev);
            }
            let mut unblocked: Vec<&RevisionId> = Vec::new();
            for succ in self.next_of(id, true) {
                if let Some((key, n)) = indegree.get_key_value(&succ) {
                    let key = *key;
                    let n = n.saturating_sub(1);
                    indegree.insert(key, n);
                    if n == 0 {
                        unblocked.push(key);
                    }
                }
            }
            unblocked.sort_unstable_by(|a, b| b.cmp(a));
            ready.extend(unblocked);
        }

        if out.len() != range.len() {
            // Build-time validation rejects cycles, so a stall here means
            // the graph value itself was corrupted.
            return Err(CoreError::IterationStalled {
                remaining: range.len() - out.len(),
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
#[path = "iterate_test.rs"]
mod tests;
