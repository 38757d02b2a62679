//! High-level engine facade: graph + planner + store + runner.
//!
//! Builds the revision graph once at construction and refuses to operate
//! on an invalid one. All state flows through explicit values; there is no
//! process-wide context.

use std::collections::BTreeSet;

use tm_core::{PathPlanner, RevisionGraph, RevisionId};
use tm_db::Database;

use crate::error::RunnerResult;
use crate::report::RunReport;
use crate::runner::{MigrationRunner, RunnerConfig};
use crate::source::MigrationSource;
use crate::version_store::{VersionStore, VersionStoreConfig};

/// Engine-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub version_store: VersionStoreConfig,
    pub runner: RunnerConfig,
}

/// Ties the planning and execution halves together for one database.
pub struct MigrationEngine<'a> {
    graph: RevisionGraph,
    db: &'a dyn Database,
    source: &'a dyn MigrationSource,
    config: EngineConfig,
}

impl std::fmt::Debug for MigrationEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("graph", &self.graph)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<'a> MigrationEngine<'a> {
    /// Build the engine, validating the source's revision collection.
    ///
    /// Graph integrity errors are fatal here: an engine never exists over
    /// an invalid history.
    pub fn new(
        db: &'a dyn Database,
        source: &'a dyn MigrationSource,
        config: EngineConfig,
    ) -> RunnerResult<Self> {
        let graph = RevisionGraph::build(source.revisions())?;
        Ok(Self {
            graph,
            db,
            source,
            config,
        })
    }

    pub fn graph(&self) -> &RevisionGraph {
        &self.graph
    }

    /// The head set currently recorded in the database.
    pub async fn current_heads(&self) -> RunnerResult<BTreeSet<RevisionId>> {
        self.store().read_heads().await
    }

    /// Upgrade the database to `target`.
    pub async fn upgrade(&self, target: &str) -> RunnerResult<RunReport> {
        let heads = self.current_heads().await?;
        let steps = PathPlanner::new(&self.graph).plan_upgrade(target, &heads)?;
        self.runner().run(&steps, &heads).await
    }

    /// Downgrade the database to `target`.
    pub async fn downgrade(&self, target: &str) -> RunnerResult<RunReport> {
        let heads = self.current_heads().await?;
        let steps = PathPlanner::new(&self.graph).plan_downgrade(target, &heads)?;
        self.runner().run(&steps, &heads).await
    }

    /// Move the recorded heads to `target` without running any scripts.
    pub async fn stamp(&self, target: &str) -> RunnerResult<RunReport> {
        let heads = self.current_heads().await?;
        let steps = PathPlanner::new(&self.graph).plan_stamp(target, &heads)?;
        self.runner().run(&steps, &heads).await
    }

    fn store(&self) -> VersionStore<'a> {
        VersionStore::new(self.db, self.config.version_store.clone())
    }

    fn runner(&self) -> MigrationRunner<'_> {
        MigrationRunner::new(
            &self.graph,
            self.db,
            self.source,
            self.store(),
            self.config.runner.clone(),
        )
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
