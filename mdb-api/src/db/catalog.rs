//! Read-only catalog lookups: users, sources, tags, authors

use mdb_common::db::{Author, Source, Tag};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::files::MAX_LINEAGE_DEPTH;
use crate::error::{ApiError, ApiResult};

/// User id by email
pub async fn find_user_id_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> ApiResult<Option<i64>> {
    let id = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(id)
}

pub async fn find_sources_by_uids(
    conn: &mut SqliteConnection,
    uids: &[String],
) -> ApiResult<Vec<Source>> {
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, uid, parent_id, name FROM sources WHERE uid IN (");
    let mut separated = qb.separated(", ");
    for uid in uids {
        separated.push_bind(uid);
    }
    qb.push(") ORDER BY id");

    let rows = qb.build().fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|r| Source::from_row(r).map_err(ApiError::from))
        .collect()
}

pub async fn find_tags_by_uids(conn: &mut SqliteConnection, uids: &[String]) -> ApiResult<Vec<Tag>> {
    if uids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, uid, parent_id, name FROM tags WHERE uid IN (");
    let mut separated = qb.separated(", ");
    for uid in uids {
        separated.push_bind(uid);
    }
    qb.push(") ORDER BY id");

    let rows = qb.build().fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|r| Tag::from_row(r).map_err(ApiError::from))
        .collect()
}

pub async fn find_source_by_uid(conn: &mut SqliteConnection, uid: &str) -> ApiResult<Option<Source>> {
    let row = sqlx::query("SELECT id, uid, parent_id, name FROM sources WHERE uid = ?")
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| Source::from_row(&r)).transpose()?)
}

pub async fn find_tag_by_uid(conn: &mut SqliteConnection, uid: &str) -> ApiResult<Option<Tag>> {
    let row = sqlx::query("SELECT id, uid, parent_id, name FROM tags WHERE uid = ?")
        .bind(uid)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|r| Tag::from_row(&r)).transpose()?)
}

/// A source and all its ancestors, nearest first
pub async fn source_path(conn: &mut SqliteConnection, id: i64) -> ApiResult<Vec<Source>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE rs(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM sources WHERE id = ?1
            UNION
            SELECT s.id, s.parent_id, rs.depth + 1
            FROM sources s INNER JOIN rs ON s.id = rs.parent_id
            WHERE rs.depth < ?2
        )
        SELECT s.id, s.uid, s.parent_id, s.name
        FROM rs INNER JOIN sources s ON s.id = rs.id
        ORDER BY rs.depth
        "#,
    )
    .bind(id)
    .bind(MAX_LINEAGE_DEPTH)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| Source::from_row(r).map_err(ApiError::from))
        .collect()
}

/// A tag and all its ancestors, nearest first
pub async fn tag_path(conn: &mut SqliteConnection, id: i64) -> ApiResult<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE rt(id, parent_id, depth) AS (
            SELECT id, parent_id, 0 FROM tags WHERE id = ?1
            UNION
            SELECT t.id, t.parent_id, rt.depth + 1
            FROM tags t INNER JOIN rt ON t.id = rt.parent_id
            WHERE rt.depth < ?2
        )
        SELECT t.id, t.uid, t.parent_id, t.name
        FROM rt INNER JOIN tags t ON t.id = rt.id
        ORDER BY rt.depth
        "#,
    )
    .bind(id)
    .bind(MAX_LINEAGE_DEPTH)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|r| Tag::from_row(r).map_err(ApiError::from))
        .collect()
}

/// Author credited with a source
pub async fn find_author_by_source_id(
    conn: &mut SqliteConnection,
    source_id: i64,
) -> ApiResult<Option<Author>> {
    let row = sqlx::query(
        r#"
        SELECT a.id, a.code, a.name, a.full_name
        FROM authors a
        INNER JOIN authors_sources x ON x.author_id = a.id
        WHERE x.source_id = ?
        ORDER BY a.id
        LIMIT 1
        "#,
    )
    .bind(source_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| Author::from_row(&r)).transpose()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdb_common::db::init_in_memory;

    async fn seed_sources(conn: &mut SqliteConnection) {
        sqlx::raw_sql(
            r#"
            INSERT INTO sources (id, uid, parent_id, name) VALUES
                (1, 'src00001', NULL, 'Collection'),
                (2, 'src00002', 1, 'Volume'),
                (3, 'src00003', 2, 'Article');
            INSERT INTO authors (id, code, name, full_name) VALUES (1, 'rb', 'Rabash', 'Rav Baruch');
            INSERT INTO authors_sources (author_id, source_id) VALUES (1, 1);
            "#,
        )
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_source_path_nearest_first() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed_sources(&mut conn).await;

        let path = source_path(&mut conn, 3).await.unwrap();
        let ids: Vec<i64> = path.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_sources_by_uids_skips_unknown() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed_sources(&mut conn).await;

        let found = find_sources_by_uids(
            &mut conn,
            &["src00003".to_string(), "missing0".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Article");
    }

    #[tokio::test]
    async fn test_author_by_source() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        seed_sources(&mut conn).await;

        let author = find_author_by_source_id(&mut conn, 1).await.unwrap().unwrap();
        assert_eq!(author.code, "rb");
        assert!(find_author_by_source_id(&mut conn, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(find_user_id_by_email(&mut conn, "nobody@example.com").await.unwrap(), None);
    }
}
