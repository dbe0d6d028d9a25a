//! Publication flags
//!
//! Publishing a file publishes its content unit and every collection that
//! contains the unit.

use sqlx::SqliteConnection;
use tracing::info;

use crate::db::{collections as collections_db, content_units as units_db, files as files_db};
use crate::error::ApiResult;

pub async fn publish_file(conn: &mut SqliteConnection, file_id: i64) -> ApiResult<()> {
    let file = files_db::load_file(conn, file_id).await?;
    files_db::set_file_published(conn, file.id).await?;

    let Some(unit_id) = file.content_unit_id else {
        info!(file_id, "Published file without content unit");
        return Ok(());
    };

    units_db::set_content_unit_published(conn, unit_id).await?;
    let collections = collections_db::publish_collections_of_unit(conn, unit_id).await?;
    info!(file_id, content_unit_id = unit_id, collections, "Published file");

    Ok(())
}

/// Recompute a collection's flag: published iff it holds a published unit
pub async fn update_collection_published(
    conn: &mut SqliteConnection,
    collection_id: i64,
) -> ApiResult<()> {
    collections_db::update_collection_published(conn, collection_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::collections::{find_collection_by_id, insert_collection, upsert_collection_content_unit};
    use crate::db::content_units::{find_content_unit_by_id, insert_content_unit};
    use crate::db::files::{insert_file, set_content_unit, NewFile};
    use crate::error::ApiError;
    use mdb_common::db::init_in_memory;

    #[tokio::test]
    async fn test_publish_cascades_to_unit_and_collections() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let file = insert_file(
            &mut conn,
            &NewFile {
                uid: "file0000".to_string(),
                name: "lesson.mp4".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let unit = insert_content_unit(&mut conn, "unit0000", 1, None).await.unwrap();
        set_content_unit(&mut conn, &[file.id], unit.id).await.unwrap();
        let member = insert_collection(&mut conn, "coll0001", 1, None).await.unwrap();
        let other = insert_collection(&mut conn, "coll0002", 1, None).await.unwrap();
        upsert_collection_content_unit(&mut conn, member.id, unit.id, "1")
            .await
            .unwrap();

        publish_file(&mut conn, file.id).await.unwrap();

        assert!(files_db::load_file(&mut conn, file.id).await.unwrap().published);
        assert!(find_content_unit_by_id(&mut conn, unit.id).await.unwrap().unwrap().published);
        assert!(find_collection_by_id(&mut conn, member.id).await.unwrap().unwrap().published);
        assert!(!find_collection_by_id(&mut conn, other.id).await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_recompute_collection_flag() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let coll = insert_collection(&mut conn, "coll0001", 1, None).await.unwrap();
        sqlx::query("UPDATE collections SET published = 1 WHERE id = ?")
            .bind(coll.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        update_collection_published(&mut conn, coll.id).await.unwrap();
        assert!(!find_collection_by_id(&mut conn, coll.id).await.unwrap().unwrap().published);
    }

    #[tokio::test]
    async fn test_publish_missing_file() {
        let pool = init_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let err = publish_file(&mut conn, 42).await.unwrap_err();
        assert!(matches!(err, ApiError::FileIdNotFound(42)));
    }
}
