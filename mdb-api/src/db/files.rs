//! File database operations

use chrono::{DateTime, Utc};
use mdb_common::db::File;
use mdb_common::properties::{self, Properties};
use serde::Serialize;
use sqlx::{Row, SqliteConnection};

use crate::error::{ApiError, ApiResult};

/// Recursion guard for lineage traversals
pub const MAX_LINEAGE_DEPTH: i64 = 256;

/// Column values of a file about to be inserted
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub uid: String,
    pub name: String,
    pub sha1: Option<Vec<u8>>,
    pub size: i64,
    pub file_type: String,
    pub sub_type: String,
    pub mime_type: Option<String>,
    pub language: Option<String>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<i64>,
    pub content_unit_id: Option<i64>,
    pub properties: Option<Properties>,
}

/// Insert a file row and return it
pub async fn insert_file(conn: &mut SqliteConnection, file: &NewFile) -> ApiResult<File> {
    let props = properties::to_column(file.properties.as_ref())?;

    let id = sqlx::query(
        r#"
        INSERT INTO files (
            uid, name, sha1, size, type, sub_type, mime_type, language,
            file_created_at, parent_id, content_unit_id, published, properties, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&file.uid)
    .bind(&file.name)
    .bind(&file.sha1)
    .bind(file.size)
    .bind(&file.file_type)
    .bind(&file.sub_type)
    .bind(&file.mime_type)
    .bind(&file.language)
    .bind(file.file_created_at)
    .bind(file.parent_id)
    .bind(file.content_unit_id)
    .bind(props)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    load_file(conn, id).await
}

/// Load file by id
pub async fn find_file_by_id(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<File>> {
    let row = sqlx::query("SELECT * FROM files WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| File::from_row(&r)).transpose()?)
}

/// Load file by id, failing when absent
pub async fn load_file(conn: &mut SqliteConnection, id: i64) -> ApiResult<File> {
    find_file_by_id(conn, id)
        .await?
        .ok_or(ApiError::FileIdNotFound(id))
}

/// Load file by content hash
pub async fn find_file_by_sha1(conn: &mut SqliteConnection, sha1: &[u8]) -> ApiResult<Option<File>> {
    let row = sqlx::query("SELECT * FROM files WHERE sha1 = ?")
        .bind(sha1)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| File::from_row(&r)).transpose()?)
}

pub async fn update_file_name(conn: &mut SqliteConnection, id: i64, name: &str) -> ApiResult<()> {
    sqlx::query("UPDATE files SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Overwrite the descriptor-derived columns of an existing file
pub async fn update_file_descriptor(conn: &mut SqliteConnection, file: &File) -> ApiResult<()> {
    sqlx::query(
        r#"
        UPDATE files
        SET name = ?, type = ?, sub_type = ?, mime_type = ?, language = ?,
            file_created_at = ?, parent_id = ?, content_unit_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&file.name)
    .bind(&file.file_type)
    .bind(&file.sub_type)
    .bind(&file.mime_type)
    .bind(&file.language)
    .bind(file.file_created_at)
    .bind(file.parent_id)
    .bind(file.content_unit_id)
    .bind(file.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn update_file_language(
    conn: &mut SqliteConnection,
    id: i64,
    language: &str,
) -> ApiResult<()> {
    sqlx::query("UPDATE files SET language = ? WHERE id = ?")
        .bind(language)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Merge `updates` into the file's property bag
///
/// Empty updates are a no-op. The merged bag is written back into `file`.
pub async fn update_file_properties(
    conn: &mut SqliteConnection,
    file: &mut File,
    updates: &Properties,
) -> ApiResult<()> {
    if updates.is_empty() {
        return Ok(());
    }

    let merged = properties::merge(file.properties.as_ref(), updates);
    sqlx::query("UPDATE files SET properties = ? WHERE id = ?")
        .bind(serde_json::to_string(&merged)?)
        .bind(file.id)
        .execute(&mut *conn)
        .await?;

    file.properties = Some(merged);
    Ok(())
}

/// Point a set of files at their owning content unit
pub async fn set_content_unit(
    conn: &mut SqliteConnection,
    file_ids: &[i64],
    content_unit_id: i64,
) -> ApiResult<()> {
    for id in file_ids {
        sqlx::query("UPDATE files SET content_unit_id = ? WHERE id = ?")
            .bind(content_unit_id)
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn set_file_published(conn: &mut SqliteConnection, id: i64) -> ApiResult<()> {
    sqlx::query("UPDATE files SET published = 1 WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Files owned by a content unit
pub async fn find_files_by_content_unit(
    conn: &mut SqliteConnection,
    content_unit_id: i64,
) -> ApiResult<Vec<File>> {
    let rows = sqlx::query("SELECT * FROM files WHERE content_unit_id = ? ORDER BY id")
        .bind(content_unit_id)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|r| File::from_row(r).map_err(ApiError::from))
        .collect()
}

/// All ancestors of a file, nearest first (the file itself excluded)
pub async fn find_file_ancestors(conn: &mut SqliteConnection, id: i64) -> ApiResult<Vec<File>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE rf(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM files WHERE id = ?1
            UNION
            SELECT f.id, f.parent_id, rf.depth + 1
            FROM files f INNER JOIN rf ON f.id = rf.parent_id
            WHERE rf.depth < ?2
        )
        SELECT f.*
        FROM rf INNER JOIN files f ON f.id = rf.id
        WHERE rf.id != ?1
        ORDER BY rf.depth
        "#,
    )
    .bind(id)
    .bind(MAX_LINEAGE_DEPTH)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| File::from_row(r).map_err(ApiError::from))
        .collect()
}

/// File node of a lineage tree, with the operations that touched it
#[derive(Debug, Clone, Serialize)]
pub struct FileWithOperations {
    pub id: i64,
    pub uid: String,
    pub name: String,
    pub sha1: Option<String>,
    pub size: i64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub sub_type: String,
    pub mime_type: Option<String>,
    pub language: Option<String>,
    pub parent_id: Option<i64>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub file_created_at: Option<DateTime<Utc>>,
    pub operation_ids: Vec<i64>,
}

/// Ancestors and descendants of a file (itself included), each with its linked operations
///
/// Files without any linked operation are omitted.
pub async fn file_tree_with_operations(
    conn: &mut SqliteConnection,
    id: i64,
) -> ApiResult<Vec<FileWithOperations>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE
        rfa(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM files WHERE id = ?1
            UNION
            SELECT f.id, f.parent_id, rfa.depth + 1
            FROM files f INNER JOIN rfa ON f.id = rfa.parent_id
            WHERE rfa.depth < ?2
        ),
        rfd(id, depth) AS (
            SELECT id, 0 FROM files WHERE id = ?1
            UNION
            SELECT f.id, rfd.depth + 1
            FROM files f INNER JOIN rfd ON f.parent_id = rfd.id
            WHERE rfd.depth < ?2
        ),
        ids(id) AS (
            SELECT id FROM rfa
            UNION
            SELECT id FROM rfd
        )
        SELECT f.*, group_concat(fo.operation_id) AS operation_ids
        FROM ids
        INNER JOIN files f ON f.id = ids.id
        INNER JOIN files_operations fo ON fo.file_id = ids.id
        GROUP BY f.id
        ORDER BY f.id
        "#,
    )
    .bind(id)
    .bind(MAX_LINEAGE_DEPTH)
    .fetch_all(&mut *conn)
    .await?;

    let mut tree = Vec::with_capacity(rows.len());
    for row in rows {
        let file = File::from_row(&row)?;
        let ids: Option<String> = row.try_get("operation_ids")?;
        let mut operation_ids = ids
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|e| ApiError::Internal(format!("Bad operation id {}: {}", s, e)))
            })
            .collect::<ApiResult<Vec<_>>>()?;
        operation_ids.sort_unstable();

        tree.push(FileWithOperations {
            sha1: file.sha1_hex(),
            id: file.id,
            uid: file.uid,
            name: file.name,
            size: file.size,
            file_type: file.file_type,
            sub_type: file.sub_type,
            mime_type: file.mime_type,
            language: file.language,
            parent_id: file.parent_id,
            published: file.published,
            created_at: file.created_at,
            file_created_at: file.file_created_at,
            operation_ids,
        });
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdb_common::db::init_in_memory;
    use mdb_common::properties::props;
    use serde_json::json;

    fn new_file(uid: &str, parent_id: Option<i64>) -> NewFile {
        NewFile {
            uid: uid.to_string(),
            name: format!("{}.mp4", uid),
            parent_id,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_find_by_sha1() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut nf = new_file("aaaaaaaa", None);
        nf.sha1 = Some(vec![7u8; 20]);
        let inserted = insert_file(&mut conn, &nf).await.unwrap();

        let found = find_file_by_sha1(&mut conn, &[7u8; 20]).await.unwrap().unwrap();
        assert_eq!(found.id, inserted.id);
        assert_eq!(found.sha1_hex().unwrap(), "07".repeat(20));
        assert!(find_file_by_sha1(&mut conn, &[8u8; 20]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ancestors_nearest_first_without_self() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let root = insert_file(&mut conn, &new_file("root0000", None)).await.unwrap();
        let a = insert_file(&mut conn, &new_file("aaaa0000", Some(root.id))).await.unwrap();
        let b = insert_file(&mut conn, &new_file("bbbb0000", Some(a.id))).await.unwrap();

        let ancestors = find_file_ancestors(&mut conn, b.id).await.unwrap();
        let ids: Vec<i64> = ancestors.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a.id, root.id]);

        assert!(find_file_ancestors(&mut conn, root.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_properties_merges() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut nf = new_file("aaaaaaaa", None);
        nf.properties = Some(props(json!({"duration": 10.0, "url": "old"})));
        let mut file = insert_file(&mut conn, &nf).await.unwrap();

        update_file_properties(&mut conn, &mut file, &props(json!({"url": "new"})))
            .await
            .unwrap();

        let reloaded = load_file(&mut conn, file.id).await.unwrap();
        assert_eq!(
            reloaded.properties,
            Some(props(json!({"duration": 10.0, "url": "new"})))
        );
    }
}
