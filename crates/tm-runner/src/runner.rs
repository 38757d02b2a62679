//! Step execution against a live database.
//!
//! The runner walks a planned step list strictly in order. Each step gets
//! its own transaction scope when the backend supports transactional DDL:
//! the apply callback and the version-table update commit together. The
//! version table is the runner's alone for the duration of a run; callers
//! serialize runs externally (e.g. an advisory lock).

use chrono::Utc;
use std::collections::BTreeSet;
use std::time::Instant;

use tm_core::{
    classify_transition, Direction, HeadsTransition, RevisionGraph, RevisionId, Step,
};
use tm_db::{Database, DbError};

use crate::error::{RunnerError, RunnerResult};
use crate::report::{RunReport, RunStatus, StepOutcome};
use crate::source::MigrationSource;
use crate::version_store::VersionStore;

/// Runner behavior configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wrap each step in its own transaction when the backend allows it.
    pub transaction_per_step: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            transaction_per_step: true,
        }
    }
}

/// Outcome of executing one step, before reporting.
enum StepError {
    /// The external apply callback failed.
    Callback(DbError),
    /// The engine itself cannot continue (drift, store fault).
    Fatal(RunnerError),
}

/// Executes a planned step sequence and keeps the version table consistent
/// at every committed step boundary.
pub struct MigrationRunner<'a> {
    graph: &'a RevisionGraph,
    db: &'a dyn Database,
    source: &'a dyn MigrationSource,
    store: VersionStore<'a>,
    config: RunnerConfig,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        graph: &'a RevisionGraph,
        db: &'a dyn Database,
        source: &'a dyn MigrationSource,
        store: VersionStore<'a>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            graph,
            db,
            source,
            store,
            config,
        }
    }

    /// Execute `steps` in order, starting from the recorded `heads_before`.
    ///
    /// Steps already committed stay applied when a later step fails; the
    /// recorded head set is a valid waypoint after every committed step.
    pub async fn run(
        &self,
        steps: &[Step],
        heads_before: &BTreeSet<RevisionId>,
    ) -> RunnerResult<RunReport> {
        let run_id = RunReport::new_run_id();
        let started_at = Utc::now();
        let transactional =
            self.config.transaction_per_step && self.db.supports_transactional_ddl();

        log::info!(
            "run {}: {} step(s), {} head(s) recorded, transactional={}",
            run_id,
            steps.len(),
            heads_before.len(),
            transactional
        );

        self.store.ensure_table().await?;

        let mut current = heads_before.clone();
        let mut outcomes: Vec<StepOutcome> = Vec::new();
        let mut last_applied: Option<Step> = None;

        for (index, step) in steps.iter().enumerate() {
            let step_started = Instant::now();
            if transactional {
                self.db.begin().await?;
            }

            match self.execute_step(step, &mut current).await {
                Ok(()) => {
                    if transactional {
                        self.db.commit().await?;
                    }
                    log::info!("run {}: {} ({}/{})", run_id, step, index + 1, steps.len());
                    outcomes.push(StepOutcome {
                        step: step.clone(),
                        finished_at: Utc::now(),
                        duration_ms: step_started.elapsed().as_millis() as u64,
                        error: None,
                    });
                    last_applied = Some(step.clone());
                }
                Err(step_err) => {
                    if transactional {
                        if let Err(rb) = self.db.rollback().await {
                            log::warn!("run {run_id}: rollback failed: {rb}");
                        }
                    }
                    return match step_err {
                        StepError::Callback(source) => {
                            let (id, direction) = match step {
                                Step::Apply {
                                    revision,
                                    direction,
                                } => (revision.to_string(), direction.to_string()),
                                // Stamp steps never invoke a callback.
                                Step::Stamp { direction, .. } => {
                                    ("<stamp>".to_string(), direction.to_string())
                                }
                            };
                            log::warn!("run {run_id}: {step} failed: {source}");
                            outcomes.push(StepOutcome {
                                step: step.clone(),
                                finished_at: Utc::now(),
                                duration_ms: step_started.elapsed().as_millis() as u64,
                                error: Some(source.to_string()),
                            });
                            let report = self
                                .build_report(run_id, started_at, RunStatus::Failed, heads_before, outcomes, last_applied)
                                .await?;
                            if transactional {
                                Err(RunnerError::Apply {
                                    id,
                                    direction,
                                    source,
                                    report: Box::new(report),
                                })
                            } else {
                                Err(RunnerError::PartialApply {
                                    id,
                                    direction,
                                    source,
                                    report: Box::new(report),
                                })
                            }
                        }
                        StepError::Fatal(err) => Err(err),
                    };
                }
            }
        }

        self.build_report(
            run_id,
            started_at,
            RunStatus::Completed,
            heads_before,
            outcomes,
            last_applied,
        )
        .await
    }

    async fn build_report(
        &self,
        run_id: String,
        started_at: chrono::DateTime<Utc>,
        status: RunStatus,
        heads_before: &BTreeSet<RevisionId>,
        steps: Vec<StepOutcome>,
        last_applied: Option<Step>,
    ) -> RunnerResult<RunReport> {
        let heads_after = self.store.read_heads().await?;
        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            heads_before: heads_before.iter().map(|id| id.to_string()).collect(),
            heads_after: heads_after.iter().map(|id| id.to_string()).collect(),
            steps,
            last_applied,
        })
    }

    async fn execute_step(
        &self,
        step: &Step,
        current: &mut BTreeSet<RevisionId>,
    ) -> Result<(), StepError> {
        match step {
            Step::Apply {
                revision,
                direction,
            } => {
                let rev = self.graph.get(revision.as_str()).ok_or_else(|| {
                    StepError::Fatal(
                        tm_core::CoreError::NotFound {
                            reference: revision.to_string(),
                        }
                        .into(),
                    )
                })?;
                if !self.source.has_script(revision) {
                    return Err(StepError::Fatal(RunnerError::ScriptMissing {
                        id: revision.to_string(),
                    }));
                }

                match direction {
                    Direction::Up => self.source.upgrade(revision, self.db).await,
                    Direction::Down => self.source.downgrade(revision, self.db).await,
                }
                .map_err(StepError::Callback)?;

                let transition = classify_transition(self.graph, current, rev, *direction);
                log::debug!("{}: {:?}", step, transition);
                self.apply_transition(&transition, current)
                    .await
                    .map_err(StepError::Fatal)
            }
            Step::Stamp { from, to, .. } => self
                .apply_stamp(from, to, current)
                .await
                .map_err(StepError::Fatal),
        }
    }

    /// The only place the version table is mutated for apply steps.
    async fn apply_transition(
        &self,
        transition: &HeadsTransition,
        current: &mut BTreeSet<RevisionId>,
    ) -> RunnerResult<()> {
        match transition {
            HeadsTransition::NewBranch { insert } => {
                self.insert_head(insert, current).await?;
            }
            HeadsTransition::DeleteBranch { delete } => {
                self.delete_head(delete, current).await?;
            }
            HeadsTransition::Merge { update, delete } => {
                self.update_head(&update.0, &update.1, current).await?;
                for id in delete {
                    self.delete_head(id, current).await?;
                }
            }
            HeadsTransition::Unmerge { update, insert } => {
                self.update_head(&update.0, &update.1, current).await?;
                for id in insert {
                    self.insert_head(id, current).await?;
                }
            }
            HeadsTransition::Update { old, new } => {
                self.update_head(old, new, current).await?;
            }
        }
        Ok(())
    }

    /// Move the recorded heads without invoking any callback.
    async fn apply_stamp(
        &self,
        from: &BTreeSet<RevisionId>,
        to: &BTreeSet<RevisionId>,
        current: &mut BTreeSet<RevisionId>,
    ) -> RunnerResult<()> {
        for id in from {
            if !current.contains(id) {
                return Err(RunnerError::StateDrift {
                    id: id.to_string(),
                    detail: "stamp source is not a recorded head".to_string(),
                });
            }
        }

        let mut from_iter = from.iter();
        let mut to_iter = to.iter();
        loop {
            match (from_iter.next(), to_iter.next()) {
                (Some(old), Some(new)) => self.update_head(old, new, current).await?,
                (Some(old), None) => self.delete_head(old, current).await?,
                (None, Some(new)) => self.insert_head(new, current).await?,
                (None, None) => break,
            }
        }
        Ok(())
    }

    async fn insert_head(
        &self,
        id: &RevisionId,
        current: &mut BTreeSet<RevisionId>,
    ) -> RunnerResult<()> {
        if current.contains(id) {
            return Err(RunnerError::StateDrift {
                id: id.to_string(),
                detail: "already recorded as a head".to_string(),
            });
        }
        self.store.insert_version(id).await?;
        current.insert(id.clone());
        Ok(())
    }

    async fn delete_head(
        &self,
        id: &RevisionId,
        current: &mut BTreeSet<RevisionId>,
    ) -> RunnerResult<()> {
        if !current.contains(id) {
            return Err(RunnerError::StateDrift {
                id: id.to_string(),
                detail: "not currently a recorded head".to_string(),
            });
        }
        self.store.delete_version(id).await?;
        current.remove(id.as_str());
        Ok(())
    }

    async fn update_head(
        &self,
        old: &RevisionId,
        new: &RevisionId,
        current: &mut BTreeSet<RevisionId>,
    ) -> RunnerResult<()> {
        if !current.contains(old) {
            return Err(RunnerError::StateDrift {
                id: old.to_string(),
                detail: "not currently a recorded head".to_string(),
            });
        }
        if current.contains(new) {
            return Err(RunnerError::StateDrift {
                id: new.to_string(),
                detail: "already recorded as a head".to_string(),
            });
        }
        self.store.update_version(old, new).await?;
        current.remove(old.as_str());
        current.insert(new.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
