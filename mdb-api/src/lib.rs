//! mdb-api library interface
//!
//! Content graph core of the media archive: records production workflow
//! events, tracks file lineage and catalogs finished content into units and
//! collections. Exposed over HTTP by the `mdb-api` binary.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mdb_common::Registries;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Fixed lookup tables, read once at startup
    pub registries: Arc<Registries>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, registries: Registries) -> Self {
        Self {
            db,
            registries: Arc::new(registries),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::operation_routes())
        .merge(api::file_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
