//! HTTP surface tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mdb_api::{build_router, AppState};
use mdb_common::db::init_in_memory;
use mdb_common::Registries;
use serde_json::{json, Value};
use tower::ServiceExt;

const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

async fn setup_app() -> Router {
    let pool = init_in_memory().await.unwrap();
    let registries = Registries::load(&pool).await.unwrap();
    build_router(AppState::new(pool, registries))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

fn upload_body() -> Value {
    json!({
        "station": "uploader",
        "user": "operator@example.com",
        "sha1": SHA,
        "file_name": "y.mp4",
        "size": 42,
        "duration": 12.5,
        "url": "http://x/y.mp4",
    })
}

#[tokio::test]
async fn test_health() {
    let app = setup_app().await;

    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mdb-api");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_upload_returns_operation_uid() {
    let app = setup_app().await;

    let (status, body) = call(&app, "POST", "/operations/upload", Some(upload_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["operation_uid"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn test_unknown_hash_is_bad_request() {
    let app = setup_app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/operations/demux",
        Some(json!({
            "station": "studio-1",
            "user": "operator@example.com",
            "sha1": SHA,
            "capture_source": "mltcap",
            "original": { "sha1": "", "file_name": "o.mp4", "duration": 1.0 },
            "proxy": { "sha1": "", "file_name": "p.mp4", "duration": 1.0 },
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_hash_is_bad_request() {
    let app = setup_app().await;

    let mut body = upload_body();
    body["sha1"] = json!("not-hex");
    let (status, body) = call(&app, "POST", "/operations/upload", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_SHA1");
}

#[tokio::test]
async fn test_file_tree_and_publish() {
    let app = setup_app().await;

    let (status, _) = call(&app, "POST", "/operations/upload", Some(upload_body())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, tree) = call(&app, "GET", "/files/1/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    let nodes = tree.as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["sha1"], SHA);
    assert_eq!(nodes[0]["operation_ids"], json!([1]));

    let (status, body) = call(&app, "POST", "/files/1/publish", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_id"], 1);

    let (_, tree) = call(&app, "GET", "/files/1/tree", None).await;
    assert_eq!(tree[0]["published"], true);
}

#[tokio::test]
async fn test_missing_file_tree_is_bad_request() {
    let app = setup_app().await;

    let (status, body) = call(&app, "GET", "/files/99/tree", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_failed_publish_reports_handler_error() {
    let app = setup_app().await;

    let (status, body) = call(&app, "POST", "/files/42/publish", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "FILE_NOT_FOUND");
}

#[tokio::test]
async fn test_failed_operation_reports_handler_error() {
    let app = setup_app().await;

    let mut body = upload_body();
    body["language"] = json!("qq");
    let (status, body) = call(&app, "POST", "/operations/upload", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "UNKNOWN_LANGUAGE");
}
