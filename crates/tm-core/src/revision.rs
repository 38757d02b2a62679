//! The revision record: one unit of schema change and its graph edges.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::revision_id::RevisionId;

/// One schema-change unit in the migration history.
///
/// A revision is immutable once handed to [`RevisionGraph::build`]
/// (crate::graph::RevisionGraph::build); everything derived from its edges
/// (heads, bases, branch/merge points) is computed by the graph, not stored
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Unique, stable identifier for this revision.
    pub id: RevisionId,

    /// Direct predecessor ids. Linear history uses one; merge points carry
    /// several; a base revision carries none.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub down_revisions: BTreeSet<RevisionId>,

    /// Additional predecessors that participate in ordering but are not
    /// "the" down-revision. Used to order across independently-rooted
    /// histories.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<RevisionId>,

    /// Symbolic names usable in references (`mybranch@head` etc.).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub branch_labels: BTreeSet<String>,

    /// Human-readable one-line description of the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Revision {
    /// Create a base revision with no predecessors.
    pub fn base(id: impl Into<RevisionId>) -> Self {
        Self {
            id: id.into(),
            down_revisions: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            branch_labels: BTreeSet::new(),
            message: None,
        }
    }

    /// Create a revision with a single down-revision (the common linear case).
    pub fn new(id: impl Into<RevisionId>, down: impl Into<RevisionId>) -> Self {
        let mut rev = Self::base(id);
        rev.down_revisions.insert(down.into());
        rev
    }

    /// Create a merge revision joining several down-revisions.
    pub fn merge<I, T>(id: impl Into<RevisionId>, downs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RevisionId>,
    {
        let mut rev = Self::base(id);
        rev.down_revisions = downs.into_iter().map(Into::into).collect();
        rev
    }

    /// Add an ordering-only dependency edge.
    pub fn with_dependency(mut self, dep: impl Into<RevisionId>) -> Self {
        self.dependencies.insert(dep.into());
        self
    }

    /// Attach a branch label.
    pub fn with_branch_label(mut self, label: impl Into<String>) -> Self {
        self.branch_labels.insert(label.into());
        self
    }

    /// Attach a description message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// All predecessor ids: `down_revisions` followed by `dependencies`.
    pub fn all_predecessors(&self) -> impl Iterator<Item = &RevisionId> {
        self.down_revisions.iter().chain(self.dependencies.iter())
    }

    /// True when this revision has no predecessors of any kind.
    pub fn is_base(&self) -> bool {
        self.down_revisions.is_empty() && self.dependencies.is_empty()
    }

    /// True when this revision joins more than one down-revision.
    pub fn is_merge_point(&self) -> bool {
        self.down_revisions.len() > 1
    }
}

#[cfg(test)]
#[path = "revision_test.rs"]
mod tests;
