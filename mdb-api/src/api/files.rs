//! File lineage endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use crate::db::files::{self as files_db, FileWithOperations};
use crate::services::publishing::publish_file;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub status: String,
    pub file_id: i64,
}

/// GET /files/:id/tree
///
/// Ancestors and descendants of a file with their linked operation ids.
pub async fn file_tree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<FileWithOperations>>> {
    let mut conn = state.db.acquire().await?;

    files_db::load_file(&mut conn, id).await?;
    let tree = files_db::file_tree_with_operations(&mut conn, id).await?;

    Ok(Json(tree))
}

/// POST /files/:id/publish
pub async fn publish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PublishResponse>> {
    let mut tx = state.db.begin().await?;

    if let Err(e) = publish_file(&mut *tx, id).await {
        warn!(file_id = id, error = %e, "Publish rolled back");
        if let Err(rb) = tx.rollback().await {
            warn!(file_id = id, error = %rb, "Rollback failed");
        }
        return Err(e);
    }
    tx.commit().await?;

    Ok(Json(PublishResponse {
        status: "ok".to_string(),
        file_id: id,
    }))
}

pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files/:id/tree", get(file_tree))
        .route("/files/:id/publish", post(publish))
}
