//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Database abstraction trait for Tidemark
///
/// The migration runner drives DDL execution and version bookkeeping
/// through this trait alone. Implementations must be Send + Sync for async
/// operation.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single SQL statement, returning affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Query the first column of every result row as strings
    async fn query_strings(&self, sql: &str) -> DbResult<Vec<String>>;

    /// Check if a table exists (optionally schema-qualified)
    async fn table_exists(&self, name: &str) -> DbResult<bool>;

    /// Begin a transaction
    async fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Whether DDL statements participate in transactions on this backend.
    ///
    /// When false the runner cannot roll back a partially applied step and
    /// reports mid-step failures as partial changes.
    fn supports_transactional_ddl(&self) -> bool;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
