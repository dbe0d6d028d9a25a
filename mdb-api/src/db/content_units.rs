//! Content unit database operations

use chrono::Utc;
use mdb_common::db::ContentUnit;
use mdb_common::properties::{self, Properties};
use sqlx::SqliteConnection;

use crate::error::{ApiError, ApiResult};

pub async fn insert_content_unit(
    conn: &mut SqliteConnection,
    uid: &str,
    type_id: i64,
    props: Option<&Properties>,
) -> ApiResult<ContentUnit> {
    let id = sqlx::query(
        "INSERT INTO content_units (uid, type_id, published, properties, created_at) VALUES (?, ?, 0, ?, ?)",
    )
    .bind(uid)
    .bind(type_id)
    .bind(properties::to_column(props)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    find_content_unit_by_id(conn, id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Content unit {} vanished after insert", id)))
}

pub async fn find_content_unit_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> ApiResult<Option<ContentUnit>> {
    let row = sqlx::query("SELECT * FROM content_units WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| ContentUnit::from_row(&r)).transpose()?)
}

/// Unit previously created for the same original/proxy pair
pub async fn find_content_unit_by_files(
    conn: &mut SqliteConnection,
    original_uid: &str,
    proxy_uid: &str,
) -> ApiResult<Option<ContentUnit>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM content_units
        WHERE json_extract(properties, '$.original_uid') = ?
          AND json_extract(properties, '$.proxy_uid') = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(original_uid)
    .bind(proxy_uid)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| ContentUnit::from_row(&r)).transpose()?)
}

pub async fn update_content_unit_type(
    conn: &mut SqliteConnection,
    unit: &mut ContentUnit,
    type_id: i64,
) -> ApiResult<()> {
    sqlx::query("UPDATE content_units SET type_id = ? WHERE id = ?")
        .bind(type_id)
        .bind(unit.id)
        .execute(&mut *conn)
        .await?;

    unit.type_id = type_id;
    Ok(())
}

/// Merge `updates` into the unit's property bag (empty updates are a no-op)
pub async fn update_content_unit_properties(
    conn: &mut SqliteConnection,
    unit: &mut ContentUnit,
    updates: &Properties,
) -> ApiResult<()> {
    if updates.is_empty() {
        return Ok(());
    }

    let merged = properties::merge(unit.properties.as_ref(), updates);
    sqlx::query("UPDATE content_units SET properties = ? WHERE id = ?")
        .bind(serde_json::to_string(&merged)?)
        .bind(unit.id)
        .execute(&mut *conn)
        .await?;

    unit.properties = Some(merged);
    Ok(())
}

pub async fn set_content_unit_published(conn: &mut SqliteConnection, id: i64) -> ApiResult<()> {
    sqlx::query("UPDATE content_units SET published = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn add_sources(
    conn: &mut SqliteConnection,
    content_unit_id: i64,
    source_ids: &[i64],
) -> ApiResult<()> {
    for source_id in source_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO content_units_sources (content_unit_id, source_id) VALUES (?, ?)",
        )
        .bind(content_unit_id)
        .bind(source_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn add_tags(
    conn: &mut SqliteConnection,
    content_unit_id: i64,
    tag_ids: &[i64],
) -> ApiResult<()> {
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO content_units_tags (content_unit_id, tag_id) VALUES (?, ?)")
            .bind(content_unit_id)
            .bind(tag_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Associate a person with a unit in a role (replaces an existing role)
pub async fn upsert_person(
    conn: &mut SqliteConnection,
    content_unit_id: i64,
    person_id: i64,
    role_id: i64,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO content_units_persons (content_unit_id, person_id, role_id)
        VALUES (?, ?, ?)
        ON CONFLICT(content_unit_id, person_id) DO UPDATE SET role_id = excluded.role_id
        "#,
    )
    .bind(content_unit_id)
    .bind(person_id)
    .bind(role_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn source_ids(conn: &mut SqliteConnection, content_unit_id: i64) -> ApiResult<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT source_id FROM content_units_sources WHERE content_unit_id = ? ORDER BY source_id",
    )
    .bind(content_unit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

pub async fn tag_ids(conn: &mut SqliteConnection, content_unit_id: i64) -> ApiResult<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT tag_id FROM content_units_tags WHERE content_unit_id = ? ORDER BY tag_id",
    )
    .bind(content_unit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// (person_id, role_id) pairs of a unit
pub async fn persons(conn: &mut SqliteConnection, content_unit_id: i64) -> ApiResult<Vec<(i64, i64)>> {
    let rows = sqlx::query_as(
        "SELECT person_id, role_id FROM content_units_persons WHERE content_unit_id = ? ORDER BY person_id",
    )
    .bind(content_unit_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdb_common::db::init_in_memory;
    use mdb_common::properties::props;
    use serde_json::json;

    #[tokio::test]
    async fn test_find_by_file_pair() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let bag = props(json!({"original_uid": "origorig", "proxy_uid": "proxprox"}));
        let unit = insert_content_unit(&mut conn, "uuuuuuuu", 1, Some(&bag))
            .await
            .unwrap();

        let found = find_content_unit_by_files(&mut conn, "origorig", "proxprox")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, unit.id);
        assert!(find_content_unit_by_files(&mut conn, "origorig", "other000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_person_upsert_keeps_one_row() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let unit = insert_content_unit(&mut conn, "uuuuuuuu", 1, None).await.unwrap();
        upsert_person(&mut conn, unit.id, 1, 1).await.unwrap();
        upsert_person(&mut conn, unit.id, 1, 2).await.unwrap();

        assert_eq!(persons(&mut conn, unit.id).await.unwrap(), vec![(1, 2)]);
    }
}
