//! Error types for tm-runner

use thiserror::Error;
use tm_core::CoreError;
use tm_db::DbError;

use crate::report::RunReport;

/// Migration runner errors
#[derive(Error, Debug)]
pub enum RunnerError {
    /// X001: Persisted heads disagree with the planned transition
    #[error("[X001] Version table out of sync at revision {id}: {detail}")]
    StateDrift { id: String, detail: String },

    /// X002: The apply callback failed; the step's transaction was rolled back
    #[error("[X002] Migration {id} failed {direction}: {source}")]
    Apply {
        id: String,
        direction: String,
        source: DbError,
        /// What the run did before failing, including the last committed step.
        report: Box<RunReport>,
    },

    /// X003: A step failed midway on a backend without transactional DDL
    #[error(
        "[X003] Migration {id} failed {direction} and the backend cannot roll back DDL; \
         the database may hold a partial change: {source}"
    )]
    PartialApply {
        id: String,
        direction: String,
        source: DbError,
        /// What the run did before failing, including the last committed step.
        report: Box<RunReport>,
    },

    /// X004: No registered script for a planned revision
    #[error("[X004] No migration script registered for revision {id}")]
    ScriptMissing { id: String },

    /// X005: A revision id exceeds the version table's column bound
    #[error("[X005] Revision id '{id}' exceeds {max} characters")]
    IdTooLong { id: String, max: usize },

    /// X006: Report file IO error
    #[error("[X006] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// X007: Report serialization error
    #[error("[X007] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Graph or planning error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Version-store persistence error
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for RunnerError
pub type RunnerResult<T> = Result<T, RunnerError>;
