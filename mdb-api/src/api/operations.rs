//! Workflow event endpoints
//!
//! One POST route per operation kind under `/operations`. Every event is
//! handled atomically: a failure leaves no trace in the store.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::debug;

use crate::models::{
    CaptureStartRequest, CaptureStopRequest, ConvertRequest, DemuxRequest, OperationRequest,
    SendRequest, TrimRequest, UploadRequest,
};
use crate::services::handle_operation;
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub status: String,
    pub operation_uid: String,
}

async fn run(state: &AppState, request: OperationRequest) -> ApiResult<Json<OperationResponse>> {
    debug!(kind = %request.kind(), station = %request.info().station, "Handling event");
    let operation = handle_operation(&state.db, &state.registries, &request).await?;

    Ok(Json(OperationResponse {
        status: "ok".to_string(),
        operation_uid: operation.uid,
    }))
}

/// POST /operations/capture_start
pub async fn capture_start(
    State(state): State<AppState>,
    Json(req): Json<CaptureStartRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::CaptureStart(req)).await
}

/// POST /operations/capture_stop
pub async fn capture_stop(
    State(state): State<AppState>,
    Json(req): Json<CaptureStopRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::CaptureStop(req)).await
}

/// POST /operations/demux
pub async fn demux(
    State(state): State<AppState>,
    Json(req): Json<DemuxRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::Demux(req)).await
}

/// POST /operations/trim
pub async fn trim(
    State(state): State<AppState>,
    Json(req): Json<TrimRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::Trim(req)).await
}

/// POST /operations/send
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::Send(req)).await
}

/// POST /operations/convert
pub async fn convert(
    State(state): State<AppState>,
    Json(req): Json<ConvertRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::Convert(req)).await
}

/// POST /operations/upload
pub async fn upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> ApiResult<Json<OperationResponse>> {
    run(&state, OperationRequest::Upload(req)).await
}

pub fn operation_routes() -> Router<AppState> {
    Router::new()
        .route("/operations/capture_start", post(capture_start))
        .route("/operations/capture_stop", post(capture_stop))
        .route("/operations/demux", post(demux))
        .route("/operations/trim", post(trim))
        .route("/operations/send", post(send))
        .route("/operations/convert", post(convert))
        .route("/operations/upload", post(upload))
}
