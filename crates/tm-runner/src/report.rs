//! Run reporting for observability and post-mortems.
//!
//! A report records what a run did: which steps applied, which failed, and
//! the head set before and after. Reports serialize to JSON and save
//! atomically so a crash never leaves a corrupt file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use tm_core::Step;

use crate::error::RunnerResult;

/// Status of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every planned step committed.
    Completed,
    /// A step failed; earlier committed steps remain applied.
    Failed,
}

/// Outcome of a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: Step,

    /// When the step committed or failed.
    pub finished_at: DateTime<Utc>,

    /// How long the step took (in milliseconds).
    pub duration_ms: u64,

    /// Error message when the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record of one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run finished.
    pub finished_at: DateTime<Utc>,

    pub status: RunStatus,

    /// Head ids recorded before the run.
    pub heads_before: Vec<String>,

    /// Head ids recorded after the run.
    pub heads_after: Vec<String>,

    /// Per-step outcomes in execution order.
    pub steps: Vec<StepOutcome>,

    /// The last step that committed, for observability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_applied: Option<Step>,
}

impl RunReport {
    /// Short random run id, matching log line width.
    pub(crate) fn new_run_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// Number of steps that committed.
    pub fn applied_count(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_none()).count()
    }

    /// Load a report from a file path.
    pub fn load(path: &Path) -> RunnerResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let report: RunReport = serde_json::from_str(&content)?;
        Ok(Some(report))
    }

    /// Save the report to a file path atomically.
    ///
    /// Uses write-to-temp-then-rename to prevent corruption.
    pub fn save(&self, path: &Path) -> RunnerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}
