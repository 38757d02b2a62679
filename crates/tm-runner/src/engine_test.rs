use super::*;
use crate::error::RunnerError;
use crate::report::RunStatus;
use crate::source::ScriptSet;
use tm_core::Revision;
use tm_db::DuckDbBackend;

fn linear_scripts() -> ScriptSet {
    ScriptSet::new()
        .with(
            Revision::base("a1").with_message("create users"),
            ["CREATE TABLE users (id INT)"],
            ["DROP TABLE users"],
        )
        .with(
            Revision::new("b2", "a1").with_message("add name column"),
            ["ALTER TABLE users ADD COLUMN name VARCHAR"],
            ["ALTER TABLE users DROP COLUMN name"],
        )
        .with(
            Revision::new("c3", "b2").with_message("create orders"),
            ["CREATE TABLE orders (id INT)"],
            ["DROP TABLE orders"],
        )
}

#[tokio::test]
async fn test_engine_upgrade_to_head() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    let report = engine.upgrade("head").await.unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.applied_count(), 3);

    let heads = engine.current_heads().await.unwrap();
    assert_eq!(heads.len(), 1);
    assert!(heads.contains("c3"));
    assert!(db.table_exists("users").await.unwrap());
    assert!(db.table_exists("orders").await.unwrap());
}

#[tokio::test]
async fn test_engine_upgrade_is_idempotent() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.upgrade("head").await.unwrap();
    let report = engine.upgrade("head").await.unwrap();
    assert!(report.steps.is_empty());
}

#[tokio::test]
async fn test_engine_round_trip() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.upgrade("head").await.unwrap();
    let heads_first = engine.current_heads().await.unwrap();

    engine.downgrade("base").await.unwrap();
    assert!(engine.current_heads().await.unwrap().is_empty());
    assert!(!db.table_exists("users").await.unwrap());

    engine.upgrade("head").await.unwrap();
    assert_eq!(engine.current_heads().await.unwrap(), heads_first);
}

#[tokio::test]
async fn test_engine_partial_upgrade_then_continue() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.upgrade("b2").await.unwrap();
    let heads = engine.current_heads().await.unwrap();
    assert!(heads.contains("b2"));

    let report = engine.upgrade("head").await.unwrap();
    assert_eq!(report.applied_count(), 1);
    assert!(engine.current_heads().await.unwrap().contains("c3"));
}

#[tokio::test]
async fn test_engine_downgrade_one_step() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.upgrade("head").await.unwrap();
    engine.downgrade("head-1").await.unwrap();

    let heads = engine.current_heads().await.unwrap();
    assert!(heads.contains("b2"));
    assert!(!db.table_exists("orders").await.unwrap());
    assert!(db.table_exists("users").await.unwrap());
}

#[tokio::test]
async fn test_engine_stamp_skips_scripts() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.stamp("head").await.unwrap();
    assert!(engine.current_heads().await.unwrap().contains("c3"));
    assert!(!db.table_exists("users").await.unwrap());
}

#[tokio::test]
async fn test_engine_rejects_invalid_history() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = ScriptSet::new().with(
        Revision::new("b2", "missing"),
        ["CREATE TABLE t (id INT)"],
        ["DROP TABLE t"],
    );
    let err = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        RunnerError::Core(tm_core::CoreError::MissingDependency { .. })
    ));
}

#[tokio::test]
async fn test_engine_resolves_relative_target() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(&db, &source, EngineConfig::default()).unwrap();

    engine.upgrade("a1+1").await.unwrap();
    assert!(engine.current_heads().await.unwrap().contains("b2"));
}

#[tokio::test]
async fn test_engine_custom_version_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let source = linear_scripts();
    let engine = MigrationEngine::new(
        &db,
        &source,
        EngineConfig {
            version_store: VersionStoreConfig {
                table_name: "schema_heads".to_string(),
            },
            runner: RunnerConfig::default(),
        },
    )
    .unwrap();

    engine.upgrade("head").await.unwrap();
    assert!(db.table_exists("schema_heads").await.unwrap());
    assert!(!db.table_exists("tidemark_version").await.unwrap());
}
