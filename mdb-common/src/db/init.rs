//! Database initialization
//!
//! Creates the content graph schema (idempotent) and seeds the fixed
//! registries on every startup.

use crate::registry::{content_roles, content_types, OperationKind, P_RAV, P_RAV_UID};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    seed_registries(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema, for tests and tooling
///
/// Limited to a single connection: every connection to `sqlite::memory:`
/// opens its own empty database.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    seed_registries(&pool).await?;

    Ok(pool)
}

/// Create every table (safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_registry_tables(pool).await?;
    create_users_table(pool).await?;
    create_catalog_tables(pool).await?;
    create_content_units_table(pool).await?;
    create_collections_table(pool).await?;
    create_files_table(pool).await?;
    create_operations_table(pool).await?;

    // Linking tables
    create_files_operations_table(pool).await?;
    create_collections_content_units_table(pool).await?;
    create_content_unit_link_tables(pool).await?;

    Ok(())
}

async fn create_registry_tables(pool: &SqlitePool) -> Result<()> {
    for table in ["operation_types", "content_types", "content_role_types"] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT
            )
            "#,
            table
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            pattern TEXT UNIQUE,
            name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Sources, tags and authors
async fn create_catalog_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            parent_id INTEGER REFERENCES sources(id),
            name TEXT NOT NULL,
            properties TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            parent_id INTEGER REFERENCES tags(id),
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            full_name TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors_sources (
            author_id INTEGER NOT NULL REFERENCES authors(id),
            source_id INTEGER NOT NULL REFERENCES sources(id),
            PRIMARY KEY (author_id, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            type_id INTEGER NOT NULL REFERENCES content_types(id),
            published INTEGER NOT NULL DEFAULT 0,
            properties TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            type_id INTEGER NOT NULL REFERENCES content_types(id),
            published INTEGER NOT NULL DEFAULT 0,
            properties TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Capture id is the reconciliation key (not unique)
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_collections_capture_id ON collections(json_extract(properties, '$.capture_id'))",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            sha1 BLOB UNIQUE,
            size INTEGER NOT NULL DEFAULT 0,
            type TEXT NOT NULL DEFAULT '',
            sub_type TEXT NOT NULL DEFAULT '',
            mime_type TEXT,
            language TEXT,
            file_created_at TIMESTAMP,
            parent_id INTEGER REFERENCES files(id),
            content_unit_id INTEGER REFERENCES content_units(id),
            published INTEGER NOT NULL DEFAULT 0,
            properties TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_parent ON files(parent_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_content_unit ON files(content_unit_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_operations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uid TEXT NOT NULL UNIQUE,
            type_id INTEGER NOT NULL REFERENCES operation_types(id),
            station TEXT,
            user_id INTEGER REFERENCES users(id),
            properties TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_operations_workflow_id ON operations(json_extract(properties, '$.workflow_id'))",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_files_operations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files_operations (
            file_id INTEGER NOT NULL REFERENCES files(id),
            operation_id INTEGER NOT NULL REFERENCES operations(id),
            is_primary INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (file_id, operation_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_files_operations_operation ON files_operations(operation_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_collections_content_units_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections_content_units (
            collection_id INTEGER NOT NULL REFERENCES collections(id),
            content_unit_id INTEGER NOT NULL REFERENCES content_units(id),
            name TEXT NOT NULL DEFAULT '',
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (collection_id, content_unit_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_unit_link_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_units_sources (
            content_unit_id INTEGER NOT NULL REFERENCES content_units(id),
            source_id INTEGER NOT NULL REFERENCES sources(id),
            PRIMARY KEY (content_unit_id, source_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_units_tags (
            content_unit_id INTEGER NOT NULL REFERENCES content_units(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id),
            PRIMARY KEY (content_unit_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_units_persons (
            content_unit_id INTEGER NOT NULL REFERENCES content_units(id),
            person_id INTEGER NOT NULL REFERENCES persons(id),
            role_id INTEGER NOT NULL REFERENCES content_role_types(id),
            PRIMARY KEY (content_unit_id, person_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert the fixed registry rows that are missing
pub async fn seed_registries(pool: &SqlitePool) -> Result<()> {
    for kind in OperationKind::ALL {
        ensure_named(pool, "operation_types", kind.name()).await?;
    }
    for name in content_types::ALL {
        ensure_named(pool, "content_types", name).await?;
    }
    for name in content_roles::ALL {
        ensure_named(pool, "content_role_types", name).await?;
    }

    sqlx::query("INSERT OR IGNORE INTO persons (uid, pattern, name) VALUES (?, ?, ?)")
        .bind(P_RAV_UID)
        .bind(P_RAV)
        .bind("Rav")
        .execute(pool)
        .await?;

    Ok(())
}

async fn ensure_named(pool: &SqlitePool, table: &str, name: &str) -> Result<()> {
    sqlx::query(&format!("INSERT OR IGNORE INTO {} (name) VALUES (?)", table))
        .bind(name)
        .execute(pool)
        .await?;

    Ok(())
}
