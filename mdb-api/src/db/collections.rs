//! Collection database operations

use chrono::Utc;
use mdb_common::db::{Collection, CollectionsContentUnit};
use mdb_common::properties::{self, Properties};
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::error::{ApiError, ApiResult};

pub async fn insert_collection(
    conn: &mut SqliteConnection,
    uid: &str,
    type_id: i64,
    props: Option<&Properties>,
) -> ApiResult<Collection> {
    let id = sqlx::query(
        "INSERT INTO collections (uid, type_id, published, properties, created_at) VALUES (?, ?, 0, ?, ?)",
    )
    .bind(uid)
    .bind(type_id)
    .bind(properties::to_column(props)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    find_collection_by_id(conn, id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Collection {} vanished after insert", id)))
}

pub async fn find_collection_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> ApiResult<Option<Collection>> {
    let row = sqlx::query("SELECT * FROM collections WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| Collection::from_row(&r)).transpose()?)
}

pub async fn find_collection_by_uid(
    conn: &mut SqliteConnection,
    uid: &str,
) -> ApiResult<Option<Collection>> {
    let row = sqlx::query("SELECT * FROM collections WHERE uid = ?")
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| Collection::from_row(&r)).transpose()?)
}

/// Collection whose `capture_id` property equals `capture_id`
///
/// Equality follows JSON value semantics: a string hint matches only a
/// string property, a number only a number.
pub async fn find_collection_by_capture_id(
    conn: &mut SqliteConnection,
    capture_id: &Value,
) -> ApiResult<Option<Collection>> {
    let query = "SELECT * FROM collections WHERE json_extract(properties, '$.capture_id') = ? ORDER BY id LIMIT 1";
    let row = match capture_id {
        Value::String(s) => {
            sqlx::query(query)
                .bind(s)
                .fetch_optional(&mut *conn)
                .await?
        }
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => sqlx::query(query).bind(i).fetch_optional(&mut *conn).await?,
            (None, Some(f)) => sqlx::query(query).bind(f).fetch_optional(&mut *conn).await?,
            (None, None) => None,
        },
        _ => None,
    };

    Ok(row.map(|r| Collection::from_row(&r)).transpose()?)
}

pub async fn update_collection_type(
    conn: &mut SqliteConnection,
    collection: &mut Collection,
    type_id: i64,
) -> ApiResult<()> {
    sqlx::query("UPDATE collections SET type_id = ? WHERE id = ?")
        .bind(type_id)
        .bind(collection.id)
        .execute(&mut *conn)
        .await?;

    collection.type_id = type_id;
    Ok(())
}

/// Merge `updates` into the collection's property bag (empty updates are a no-op)
pub async fn update_collection_properties(
    conn: &mut SqliteConnection,
    collection: &mut Collection,
    updates: &Properties,
) -> ApiResult<()> {
    if updates.is_empty() {
        return Ok(());
    }

    let merged = properties::merge(collection.properties.as_ref(), updates);
    sqlx::query("UPDATE collections SET properties = ? WHERE id = ?")
        .bind(serde_json::to_string(&merged)?)
        .bind(collection.id)
        .execute(&mut *conn)
        .await?;

    collection.properties = Some(merged);
    Ok(())
}

/// Next free membership position (0 for an empty collection)
pub async fn next_position(conn: &mut SqliteConnection, collection_id: i64) -> ApiResult<i64> {
    let position = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM collections_content_units WHERE collection_id = ?",
    )
    .bind(collection_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(position)
}

/// Create or relabel the membership of a unit in a collection
///
/// A new membership takes the next free position; an existing one keeps
/// its position and only gets the new label.
pub async fn upsert_collection_content_unit(
    conn: &mut SqliteConnection,
    collection_id: i64,
    content_unit_id: i64,
    name: &str,
) -> ApiResult<()> {
    let position = next_position(conn, collection_id).await?;

    sqlx::query(
        r#"
        INSERT INTO collections_content_units (collection_id, content_unit_id, name, position)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(collection_id, content_unit_id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(collection_id)
    .bind(content_unit_id)
    .bind(name)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn collection_content_units(
    conn: &mut SqliteConnection,
    collection_id: i64,
) -> ApiResult<Vec<CollectionsContentUnit>> {
    let rows = sqlx::query(
        "SELECT * FROM collections_content_units WHERE collection_id = ? ORDER BY position",
    )
    .bind(collection_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| CollectionsContentUnit::from_row(r).map_err(ApiError::from))
        .collect()
}

/// Mark every collection containing the unit as published
pub async fn publish_collections_of_unit(
    conn: &mut SqliteConnection,
    content_unit_id: i64,
) -> ApiResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE collections SET published = 1
        WHERE id IN (
            SELECT DISTINCT collection_id FROM collections_content_units WHERE content_unit_id = ?
        )
        "#,
    )
    .bind(content_unit_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute a collection's published flag from its units
pub async fn update_collection_published(conn: &mut SqliteConnection, id: i64) -> ApiResult<()> {
    sqlx::query(
        r#"
        UPDATE collections
        SET published = EXISTS (
            SELECT 1
            FROM collections_content_units ccu
            INNER JOIN content_units cu ON ccu.content_unit_id = cu.id
            WHERE ccu.collection_id = ?1 AND cu.published = 1
        )
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
