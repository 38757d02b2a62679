//! Revision graph construction and traversal.
//!
//! The graph is built eagerly and is immutable afterwards: every derived
//! index (heads, bases, forward edges) is computed once in
//! [`RevisionGraph::build`]. Adding revisions produces a new graph value via
//! [`RevisionGraph::rebuild`], never an in-place cache invalidation.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{CoreError, CoreResult};
use crate::revision::Revision;
use crate::revision_id::RevisionId;

/// Kind of a predecessor edge.
///
/// `Versioned` edges come from `down_revisions` and define lineage: heads,
/// branches and merges are computed over them. `Dependency` edges only
/// participate in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Versioned,
    Dependency,
}

/// In-memory index over a collection of [`Revision`]s.
///
/// Edges in the underlying graph point from predecessor to successor, so
/// `Outgoing` edges of a node lead to newer revisions and `Incoming` edges
/// to older ones.
#[derive(Debug)]
pub struct RevisionGraph {
    graph: DiGraph<RevisionId, EdgeKind>,
    node_map: HashMap<RevisionId, NodeIndex>,
    revisions: BTreeMap<RevisionId, Revision>,
    labels: BTreeMap<String, RevisionId>,
    heads: BTreeSet<RevisionId>,
    bases: BTreeSet<RevisionId>,
}

impl RevisionGraph {
    /// Build a graph from a full revision collection.
    ///
    /// Rejects duplicate ids, branch-label collisions, references to ids
    /// that are not part of the collection, and cyclic histories. All
    /// missing references of the first offending revision are reported
    /// together rather than one at a time.
    pub fn build(revisions: Vec<Revision>) -> CoreResult<Self> {
        let mut by_id: BTreeMap<RevisionId, Revision> = BTreeMap::new();
        for rev in revisions {
            if by_id.contains_key(&rev.id) {
                return Err(CoreError::DuplicateRevision {
                    id: rev.id.to_string(),
                });
            }
            by_id.insert(rev.id.clone(), rev);
        }

        // Branch labels share one namespace with revision ids.
        let mut labels: BTreeMap<String, RevisionId> = BTreeMap::new();
        for rev in by_id.values() {
            for label in &rev.branch_labels {
                if by_id.contains_key(label.as_str()) {
                    return Err(CoreError::LabelCollision {
                        label: label.clone(),
                        id: rev.id.to_string(),
                        other: format!("revision id '{label}'"),
                    });
                }
                if let Some(existing) = labels.get(label) {
                    if *existing != rev.id {
                        return Err(CoreError::LabelCollision {
                            label: label.clone(),
                            id: rev.id.to_string(),
                            other: format!("label on revision {existing}"),
                        });
                    }
                }
                labels.insert(label.clone(), rev.id.clone());
            }
        }

        // Every referenced predecessor must exist; missing ids are a
        // bootstrap error, never silently dropped.
        for rev in by_id.values() {
            let missing: Vec<&RevisionId> = rev
                .all_predecessors()
                .filter(|p| !by_id.contains_key(p.as_str()))
                .collect();
            if !missing.is_empty() {
                return Err(CoreError::MissingDependency {
                    id: rev.id.to_string(),
                    missing: missing
                        .iter()
                        .map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
        }

        let mut graph: DiGraph<RevisionId, EdgeKind> = DiGraph::new();
        let mut node_map: HashMap<RevisionId, NodeIndex> = HashMap::new();
        for id in by_id.keys() {
            let idx = graph.add_node(id.clone());
            node_map.insert(id.clone(), idx);
        }
        for rev in by_id.values() {
            let succ = node_map[&rev.id];
            for down in &rev.down_revisions {
                graph.add_edge(node_map[down], succ, EdgeKind::Versioned);
            }
            for dep in &rev.dependencies {
                graph.add_edge(node_map[dep], succ, EdgeKind::Dependency);
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let cycle_str = Self::find_cycle_path(&graph, cycle.node_id());
            return Err(CoreError::CircularHistory { cycle: cycle_str });
        }

        // A head has no successor via a versioned edge; dependency-only
        // successors do not disqualify headship.
        let heads: BTreeSet<RevisionId> = by_id
            .keys()
            .filter(|id| {
                graph
                    .edges_directed(node_map[*id], Direction::Outgoing)
                    .all(|e| *e.weight() != EdgeKind::Versioned)
            })
            .cloned()
            .collect();

        let bases: BTreeSet<RevisionId> = by_id
            .values()
            .filter(|rev| rev.is_base())
            .map(|rev| rev.id.clone())
            .collect();

        log::debug!(
            "built revision graph: {} revision(s), {} head(s), {} base(s)",
            by_id.len(),
            heads.len(),
            bases.len()
        );

        Ok(Self {
            graph,
            node_map,
            revisions: by_id,
            labels,
            heads,
            bases,
        })
    }

    /// Consume this graph and build a new one with additional revisions.
    pub fn rebuild(self, additional: Vec<Revision>) -> CoreResult<Self> {
        let mut revisions: Vec<Revision> = self.revisions.into_values().collect();
        revisions.extend(additional);
        Self::build(revisions)
    }

    /// Reconstruct a cycle path starting from a node for error reporting.
    fn find_cycle_path(graph: &DiGraph<RevisionId, EdgeKind>, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = graph.edges(current).next() {
            let target = edge.target();
            path.push(graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Look up a revision by exact id.
    pub fn get(&self, id: &str) -> Option<&Revision> {
        self.revisions.get(id)
    }

    /// Current head ids (no successor via a versioned edge).
    pub fn heads(&self) -> &BTreeSet<RevisionId> {
        &self.heads
    }

    /// Base ids (no predecessors of any kind).
    pub fn bases(&self) -> &BTreeSet<RevisionId> {
        &self.bases
    }

    /// The single head, or a `MultipleHeads` error listing candidates.
    pub fn single_head(&self) -> CoreResult<&RevisionId> {
        let mut iter = self.heads.iter();
        let first = iter.next().ok_or_else(|| CoreError::NotFound {
            reference: "head".to_string(),
        })?;
        if iter.next().is_some() {
            return Err(CoreError::MultipleHeads {
                candidates: join_ids(&self.heads),
            });
        }
        Ok(first)
    }

    /// Number of revisions in the graph.
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// True when the graph holds no revisions.
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Check if a revision id exists in the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.revisions.contains_key(id)
    }

    /// Iterate all revisions in id order.
    pub fn revisions(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.values()
    }

    /// The revision a branch label points at, if any.
    pub fn label_anchor(&self, label: &str) -> Option<&RevisionId> {
        self.labels.get(label)
    }

    /// All ids starting with `prefix`, in id order.
    pub fn ids_by_prefix(&self, prefix: &str) -> Vec<&RevisionId> {
        self.revisions
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(id, _)| id)
            .collect()
    }

    /// Direct successors of `id`.
    pub fn next_of(&self, id: &str, include_dependencies: bool) -> BTreeSet<RevisionId> {
        self.neighbors(id, Direction::Outgoing, include_dependencies)
    }

    /// Direct predecessors of `id`.
    pub fn previous_of(&self, id: &str, include_dependencies: bool) -> BTreeSet<RevisionId> {
        self.neighbors(id, Direction::Incoming, include_dependencies)
    }

    fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        include_dependencies: bool,
    ) -> BTreeSet<RevisionId> {
        let Some(&idx) = self.node_map.get(id) else {
            return BTreeSet::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .filter(|e| include_dependencies || *e.weight() == EdgeKind::Versioned)
            .map(|e| {
                let n = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                self.graph[n].clone()
            })
            .collect()
    }

    /// All revisions reachable from `ids` via reverse edges, excluding the
    /// starting ids themselves.
    ///
    /// `include_dependencies=false` restricts the walk to versioned edges,
    /// for when only real linear history matters.
    pub fn ancestors<'a, I>(&self, ids: I, include_dependencies: bool) -> BTreeSet<RevisionId>
    where
        I: IntoIterator<Item = &'a RevisionId>,
    {
        self.collect_reachable(ids, Direction::Incoming, include_dependencies)
    }

    /// All revisions reachable from `ids` via forward edges, excluding the
    /// starting ids themselves.
    pub fn descendants<'a, I>(&self, ids: I, include_dependencies: bool) -> BTreeSet<RevisionId>
    where
        I: IntoIterator<Item = &'a RevisionId>,
    {
        self.collect_reachable(ids, Direction::Outgoing, include_dependencies)
    }

    fn collect_reachable<'a, I>(
        &self,
        ids: I,
        direction: Direction,
        include_dependencies: bool,
    ) -> BTreeSet<RevisionId>
    where
        I: IntoIterator<Item = &'a RevisionId>,
    {
        let mut result = BTreeSet::new();
        let mut stack: Vec<NodeIndex> = ids
            .into_iter()
            .filter_map(|id| self.node_map.get(id.as_str()).copied())
            .collect();
        let mut visited: HashSet<NodeIndex> = stack.iter().copied().collect();

        while let Some(idx) = stack.pop() {
            for edge in self.graph.edges_directed(idx, direction) {
                if !include_dependencies && *edge.weight() != EdgeKind::Versioned {
                    continue;
                }
                let neighbor = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                if visited.insert(neighbor) {
                    result.insert(self.graph[neighbor].clone());
                    stack.push(neighbor);
                }
            }
        }

        result
    }

    /// True when `id` has more than one successor via versioned edges.
    pub fn is_branch_point(&self, id: &str) -> bool {
        self.next_of(id, false).len() > 1
    }

    /// True when `id` joins more than one down-revision.
    pub fn is_merge_point(&self, id: &str) -> bool {
        self.get(id).is_some_and(|rev| rev.is_merge_point())
    }

    /// True when `id` is a current head.
    pub fn is_head(&self, id: &str) -> bool {
        self.heads.contains(id)
    }

    /// True when `id` is a base.
    pub fn is_base(&self, id: &str) -> bool {
        self.bases.contains(id)
    }

    /// Revisions belonging to the branch named by `label`: the labeled
    /// revision plus its versioned descendants.
    pub fn branch_members(&self, label: &str) -> CoreResult<BTreeSet<RevisionId>> {
        let anchor = self
            .label_anchor(label)
            .ok_or_else(|| CoreError::NotFound {
                reference: label.to_string(),
            })?
            .clone();
        let mut members = self.descendants([&anchor], false);
        members.insert(anchor);
        Ok(members)
    }

    /// Heads of the branch named by `label`.
    pub fn branch_heads(&self, label: &str) -> CoreResult<BTreeSet<RevisionId>> {
        let members = self.branch_members(label)?;
        Ok(self.heads.intersection(&members).cloned().collect())
    }

    /// Bases of the branch containing the revision labeled `label`: the
    /// ancestors (and the anchor itself) that have no predecessors.
    pub fn branch_bases(&self, label: &str) -> CoreResult<BTreeSet<RevisionId>> {
        let anchor = self
            .label_anchor(label)
            .ok_or_else(|| CoreError::NotFound {
                reference: label.to_string(),
            })?
            .clone();
        let mut lineage = self.ancestors([&anchor], false);
        lineage.insert(anchor);
        Ok(self.bases.intersection(&lineage).cloned().collect())
    }
}

/// Join a set of ids into a comma-separated list for error messages.
pub(crate) fn join_ids(ids: &BTreeSet<RevisionId>) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
