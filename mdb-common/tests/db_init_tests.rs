//! On-disk database initialization tests

use mdb_common::db::init_database;
use mdb_common::registry::{OperationKind, P_RAV};
use mdb_common::Registries;
use tempfile::TempDir;

#[tokio::test]
async fn test_init_creates_database_and_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("mdb.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
    for expected in [
        "collections",
        "collections_content_units",
        "content_units",
        "files",
        "files_operations",
        "operations",
        "persons",
        "sources",
        "tags",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_reopen_keeps_registry_ids_stable() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("mdb.db");

    let pool = init_database(&db_path).await.unwrap();
    let first = Registries::load(&pool).await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let second = Registries::load(&pool).await.unwrap();

    for kind in OperationKind::ALL {
        assert_eq!(first.operation_type_id(kind), second.operation_type_id(kind));
    }
    assert_eq!(first.persons.get(P_RAV), second.persons.get(P_RAV));
    assert_eq!(first.operation_types.len(), second.operation_types.len());
}

#[tokio::test]
async fn test_wal_mode_enabled() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("mdb.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
