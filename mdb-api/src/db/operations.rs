//! Operation database operations

use chrono::Utc;
use mdb_common::db::Operation;
use mdb_common::properties::{self, Properties};
use sqlx::SqliteConnection;

use super::files::MAX_LINEAGE_DEPTH;
use crate::error::{ApiError, ApiResult};

/// Insert an operation row and return it
pub async fn insert_operation(
    conn: &mut SqliteConnection,
    uid: &str,
    type_id: i64,
    station: &str,
    user_id: Option<i64>,
    props: Option<&Properties>,
) -> ApiResult<Operation> {
    let id = sqlx::query(
        r#"
        INSERT INTO operations (uid, type_id, station, user_id, properties, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(uid)
    .bind(type_id)
    .bind(station)
    .bind(user_id)
    .bind(properties::to_column(props)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    find_operation_by_id(conn, id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("Operation {} vanished after insert", id)))
}

pub async fn find_operation_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> ApiResult<Option<Operation>> {
    let row = sqlx::query("SELECT * FROM operations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| Operation::from_row(&r)).transpose()?)
}

/// Record which files an operation created or touched
///
/// Re-linking an already linked file keeps the existing row.
pub async fn link_files(
    conn: &mut SqliteConnection,
    operation_id: i64,
    is_primary: bool,
    file_ids: &[i64],
) -> ApiResult<()> {
    for file_id in file_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO files_operations (file_id, operation_id, is_primary) VALUES (?, ?, ?)",
        )
        .bind(file_id)
        .bind(operation_id)
        .bind(is_primary)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Ids of the files linked to an operation
pub async fn linked_file_ids(conn: &mut SqliteConnection, operation_id: i64) -> ApiResult<Vec<i64>> {
    let ids = sqlx::query_scalar(
        "SELECT file_id FROM files_operations WHERE operation_id = ? ORDER BY file_id",
    )
    .bind(operation_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

/// File produced by the operation of type `type_id` carrying `workflow_id`
///
/// Used to pair a capture_stop with its capture_start.
pub async fn find_file_by_workflow_id(
    conn: &mut SqliteConnection,
    type_id: i64,
    workflow_id: &str,
) -> ApiResult<Option<i64>> {
    let file_id = sqlx::query_scalar(
        r#"
        SELECT fo.file_id
        FROM files_operations fo
        INNER JOIN operations o ON fo.operation_id = o.id
        WHERE o.type_id = ? AND json_extract(o.properties, '$.workflow_id') = ?
        ORDER BY o.id, fo.file_id
        LIMIT 1
        "#,
    )
    .bind(type_id)
    .bind(workflow_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(file_id)
}

/// Nearest operation of type `type_id` up the lineage of a file
///
/// Walks from the file itself up through its parents. At each file only the
/// earliest linked operation (minimum id) counts; the match closest to the
/// start file wins.
pub async fn find_up_chain_operation(
    conn: &mut SqliteConnection,
    file_id: i64,
    type_id: i64,
) -> ApiResult<Option<Operation>> {
    let row = sqlx::query(
        r#"
        WITH RECURSIVE rf(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM files WHERE id = ?1
            UNION
            SELECT f.id, f.parent_id, rf.depth + 1
            FROM files f INNER JOIN rf ON f.id = rf.parent_id
            WHERE rf.depth < ?3
        )
        SELECT o.*
        FROM rf
        INNER JOIN operations o
            ON o.id = (SELECT MIN(operation_id) FROM files_operations WHERE file_id = rf.id)
        WHERE o.type_id = ?2
        ORDER BY rf.depth
        LIMIT 1
        "#,
    )
    .bind(file_id)
    .bind(type_id)
    .bind(MAX_LINEAGE_DEPTH)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| Operation::from_row(&r)).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::files::{insert_file, NewFile};
    use mdb_common::db::init_in_memory;
    use mdb_common::properties::props;
    use serde_json::json;

    #[tokio::test]
    async fn test_workflow_lookup_matches_type_and_token() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let file = insert_file(
            &mut conn,
            &NewFile {
                uid: "ffffffff".into(),
                name: "capture".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let op = insert_operation(
            &mut conn,
            "oooooooo",
            1,
            "station",
            None,
            Some(&props(json!({"workflow_id": "W1"}))),
        )
        .await
        .unwrap();
        link_files(&mut conn, op.id, true, &[file.id]).await.unwrap();

        assert_eq!(
            find_file_by_workflow_id(&mut conn, 1, "W1").await.unwrap(),
            Some(file.id)
        );
        assert_eq!(find_file_by_workflow_id(&mut conn, 1, "W2").await.unwrap(), None);
        assert_eq!(find_file_by_workflow_id(&mut conn, 2, "W1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_link_files_is_idempotent() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let file = insert_file(
            &mut conn,
            &NewFile {
                uid: "ffffffff".into(),
                name: "f".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let op = insert_operation(&mut conn, "oooooooo", 1, "s", None, None)
            .await
            .unwrap();

        link_files(&mut conn, op.id, false, &[file.id]).await.unwrap();
        link_files(&mut conn, op.id, false, &[file.id]).await.unwrap();

        assert_eq!(linked_file_ids(&mut conn, op.id).await.unwrap(), vec![file.id]);
    }
}
