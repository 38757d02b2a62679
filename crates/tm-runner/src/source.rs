//! The revision-script contract.
//!
//! A [`MigrationSource`] supplies the revision collection and the
//! upgrade/downgrade callables the runner invokes per apply step. Scripts
//! live outside the engine; [`ScriptSet`] is an in-memory implementation
//! carrying plain SQL, used by embedders and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tm_core::{Revision, RevisionId};
use tm_db::{Database, DbResult};

/// Collaborator supplying revisions and their apply callables.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    /// The full revision collection the graph is built from.
    fn revisions(&self) -> Vec<Revision>;

    /// Whether an apply callable is registered for `id`.
    fn has_script(&self, id: &RevisionId) -> bool;

    /// Execute the upgrade path of revision `id`.
    async fn upgrade(&self, id: &RevisionId, db: &dyn Database) -> DbResult<()>;

    /// Execute the downgrade path of revision `id`.
    async fn downgrade(&self, id: &RevisionId, db: &dyn Database) -> DbResult<()>;
}

/// One registered script: the revision plus its SQL in both directions.
#[derive(Debug, Clone)]
struct Script {
    revision: Revision,
    up_sql: Vec<String>,
    down_sql: Vec<String>,
}

/// In-memory [`MigrationSource`] over SQL-statement scripts.
#[derive(Debug, Default)]
pub struct ScriptSet {
    scripts: BTreeMap<RevisionId, Script>,
}

impl ScriptSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a revision with its upgrade and downgrade statements.
    ///
    /// A duplicate id silently replaces the earlier registration; the graph
    /// build rejects duplicates across distinct revisions.
    pub fn register<I, J, S>(&mut self, revision: Revision, up_sql: I, down_sql: J)
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = revision.id.clone();
        self.scripts.insert(
            id,
            Script {
                revision,
                up_sql: up_sql.into_iter().map(Into::into).collect(),
                down_sql: down_sql.into_iter().map(Into::into).collect(),
            },
        );
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<I, J, S>(mut self, revision: Revision, up_sql: I, down_sql: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register(revision, up_sql, down_sql);
        self
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    async fn run_statements(&self, statements: &[String], db: &dyn Database) -> DbResult<()> {
        for sql in statements {
            db.execute_batch(sql).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MigrationSource for ScriptSet {
    fn revisions(&self) -> Vec<Revision> {
        self.scripts.values().map(|s| s.revision.clone()).collect()
    }

    fn has_script(&self, id: &RevisionId) -> bool {
        self.scripts.contains_key(id)
    }

    async fn upgrade(&self, id: &RevisionId, db: &dyn Database) -> DbResult<()> {
        match self.scripts.get(id) {
            Some(script) => self.run_statements(&script.up_sql, db).await,
            None => Ok(()),
        }
    }

    async fn downgrade(&self, id: &RevisionId, db: &dyn Database) -> DbResult<()> {
        match self.scripts.get(id) {
            Some(script) => self.run_statements(&script.down_sql, db).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_db::DuckDbBackend;

    #[tokio::test]
    async fn test_register_and_list() {
        let set = ScriptSet::new()
            .with(
                Revision::base("a1"),
                ["CREATE TABLE users (id INT)"],
                ["DROP TABLE users"],
            )
            .with(
                Revision::new("b2", "a1"),
                ["ALTER TABLE users ADD COLUMN name VARCHAR"],
                ["ALTER TABLE users DROP COLUMN name"],
            );

        assert_eq!(set.len(), 2);
        assert!(set.has_script(&RevisionId::new("a1")));
        assert!(!set.has_script(&RevisionId::new("zz")));
        assert_eq!(set.revisions().len(), 2);
    }

    #[tokio::test]
    async fn test_upgrade_runs_sql() {
        let db = DuckDbBackend::in_memory().unwrap();
        let set = ScriptSet::new().with(
            Revision::base("a1"),
            ["CREATE TABLE users (id INT)"],
            ["DROP TABLE users"],
        );

        set.upgrade(&RevisionId::new("a1"), &db).await.unwrap();
        assert!(db.table_exists("users").await.unwrap());

        set.downgrade(&RevisionId::new("a1"), &db).await.unwrap();
        assert!(!db.table_exists("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_unregistered_id_is_a_no_op() {
        let db = DuckDbBackend::in_memory().unwrap();
        let set = ScriptSet::new();
        set.upgrade(&RevisionId::new("ghost"), &db).await.unwrap();
    }
}
