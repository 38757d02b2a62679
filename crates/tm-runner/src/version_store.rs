//! Persisted record of the database's current head revisions.
//!
//! One table, one id column, one row per current head; zero rows means the
//! database is at base. The migration runner is the only writer.

use std::collections::BTreeSet;

use tm_core::RevisionId;
use tm_db::Database;

use crate::error::{RunnerError, RunnerResult};

/// Longest revision id the version column accepts.
pub const MAX_VERSION_LENGTH: usize = 32;

/// Configuration for the version table.
#[derive(Debug, Clone)]
pub struct VersionStoreConfig {
    /// Name of the table holding current head ids.
    pub table_name: String,
}

impl Default for VersionStoreConfig {
    fn default() -> Self {
        Self {
            table_name: "tidemark_version".to_string(),
        }
    }
}

/// Reads and writes the version table through a [`Database`] handle.
pub struct VersionStore<'a> {
    db: &'a dyn Database,
    config: VersionStoreConfig,
}

impl<'a> VersionStore<'a> {
    pub fn new(db: &'a dyn Database, config: VersionStoreConfig) -> Self {
        Self { db, config }
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// Create the version table when absent.
    pub async fn ensure_table(&self) -> RunnerResult<()> {
        self.db
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (version_id VARCHAR({}) NOT NULL PRIMARY KEY)",
                self.config.table_name, MAX_VERSION_LENGTH
            ))
            .await?;
        Ok(())
    }

    /// The recorded head set; empty when the table is missing or empty.
    pub async fn read_heads(&self) -> RunnerResult<BTreeSet<RevisionId>> {
        if !self.db.table_exists(&self.config.table_name).await? {
            return Ok(BTreeSet::new());
        }
        let rows = self
            .db
            .query_strings(&format!(
                "SELECT version_id FROM {} ORDER BY version_id",
                self.config.table_name
            ))
            .await?;
        Ok(rows.into_iter().map(RevisionId::new).collect())
    }

    /// Record a new head. The id must not already be present.
    pub async fn insert_version(&self, id: &RevisionId) -> RunnerResult<()> {
        self.check_length(id)?;
        let existing = self
            .db
            .query_strings(&format!(
                "SELECT version_id FROM {} WHERE version_id = '{}'",
                self.config.table_name,
                escape(id)
            ))
            .await?;
        if !existing.is_empty() {
            return Err(RunnerError::StateDrift {
                id: id.to_string(),
                detail: "already recorded as a head".to_string(),
            });
        }
        self.db
            .execute(&format!(
                "INSERT INTO {} (version_id) VALUES ('{}')",
                self.config.table_name,
                escape(id)
            ))
            .await?;
        Ok(())
    }

    /// Remove a recorded head. The id must currently be present.
    pub async fn delete_version(&self, id: &RevisionId) -> RunnerResult<()> {
        let affected = self
            .db
            .execute(&format!(
                "DELETE FROM {} WHERE version_id = '{}'",
                self.config.table_name,
                escape(id)
            ))
            .await?;
        if affected != 1 {
            return Err(RunnerError::StateDrift {
                id: id.to_string(),
                detail: format!("delete affected {affected} row(s), expected 1"),
            });
        }
        Ok(())
    }

    /// Replace one recorded head with another in place.
    pub async fn update_version(&self, old: &RevisionId, new: &RevisionId) -> RunnerResult<()> {
        self.check_length(new)?;
        let affected = self
            .db
            .execute(&format!(
                "UPDATE {} SET version_id = '{}' WHERE version_id = '{}'",
                self.config.table_name,
                escape(new),
                escape(old)
            ))
            .await?;
        if affected != 1 {
            return Err(RunnerError::StateDrift {
                id: old.to_string(),
                detail: format!("update affected {affected} row(s), expected 1"),
            });
        }
        Ok(())
    }

    fn check_length(&self, id: &RevisionId) -> RunnerResult<()> {
        if id.as_str().len() > MAX_VERSION_LENGTH {
            return Err(RunnerError::IdTooLong {
                id: id.to_string(),
                max: MAX_VERSION_LENGTH,
            });
        }
        Ok(())
    }
}

/// Escape single quotes for embedding an id in a SQL literal.
fn escape(id: &RevisionId) -> String {
    id.as_str().replace('\'', "''")
}
