//! Error types for tm-core

use thiserror::Error;

/// Core error type for Tidemark
#[derive(Error, Debug)]
pub enum CoreError {
    // Graph integrity errors (G001-G005), fatal at build time
    /// G001: Duplicate revision id
    #[error("[G001] Duplicate revision id: {id}")]
    DuplicateRevision { id: String },

    /// G002: Branch label collides with an existing id or label
    #[error("[G002] Branch label '{label}' on revision {id} collides with {other}")]
    LabelCollision {
        label: String,
        id: String,
        other: String,
    },

    /// G003: A down-revision or dependency references an id that does not exist
    #[error("[G003] Revision {id} references unknown revision(s): {missing}")]
    MissingDependency { id: String, missing: String },

    /// G004: Revision history contains a cycle
    #[error("[G004] Revision history contains a cycle: {cycle}")]
    CircularHistory { cycle: String },

    /// G005: Iteration could not make forward progress on a malformed graph
    #[error("[G005] Iteration stalled: {remaining} revision(s) unreachable from the range bounds")]
    IterationStalled { remaining: usize },

    // Resolution errors (R001-R005), recoverable by the caller
    /// R001: Reference does not match any revision
    #[error("[R001] No revision matches reference '{reference}'")]
    NotFound { reference: String },

    /// R002: Id prefix matches more than one revision
    #[error("[R002] Ambiguous reference '{reference}' matches: {candidates}")]
    AmbiguousPrefix {
        reference: String,
        candidates: String,
    },

    /// R003: Reference is syntactically invalid or walks off the history
    #[error("[R003] Invalid reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    /// R004: A single head was required but several exist
    #[error("[R004] Multiple heads present, specify one of: {candidates}")]
    MultipleHeads { candidates: String },

    /// R005: Requested lower bound is not an ancestor of the upper bound
    #[error("[R005] Revision {lower} is not an ancestor of {upper}")]
    RangeNotAncestor { lower: String, upper: String },
}

impl CoreError {
    /// True for errors that invalidate the graph itself rather than a
    /// single request; the engine refuses to operate past these.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            CoreError::DuplicateRevision { .. }
                | CoreError::LabelCollision { .. }
                | CoreError::MissingDependency { .. }
                | CoreError::CircularHistory { .. }
                | CoreError::IterationStalled { .. }
        )
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
