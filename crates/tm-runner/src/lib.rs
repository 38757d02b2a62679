//! tm-runner - Migration execution for Tidemark
//!
//! This crate provides the version store (the persisted record of current
//! head revisions), the migration runner that walks planned steps
//! transactionally, the revision-script contract, and run reporting.

pub mod engine;
pub mod error;
pub mod report;
pub mod runner;
pub mod source;
pub mod version_store;

pub use engine::{EngineConfig, MigrationEngine};
pub use error::{RunnerError, RunnerResult};
pub use report::{RunReport, RunStatus, StepOutcome};
pub use runner::{MigrationRunner, RunnerConfig};
pub use source::{MigrationSource, ScriptSet};
pub use version_store::{VersionStore, VersionStoreConfig, MAX_VERSION_LENGTH};
