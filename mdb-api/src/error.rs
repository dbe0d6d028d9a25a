//! Error types for mdb-api
//!
//! Failures are split into two classes: bad input (validation failures,
//! unresolved references supplied by the caller) and internal (storage or
//! unexpected). The transport maps the former to 400 and the latter to 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mdb_common::registry::OperationKind;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No file with the given content hash
    #[error("File not found, sha1 = {sha1}")]
    FileNotFound { sha1: String },

    /// No file with the given id
    #[error("File not found, id = {0}")]
    FileIdNotFound(i64),

    /// Language tag that is neither a known code nor a mapped 3-letter code
    #[error("Unknown language {0}")]
    UnknownLanguage(String),

    /// Content hash that is not valid hex of 20 bytes
    #[error("Invalid sha1 {0}")]
    InvalidSha1(String),

    /// Explicit collection reference that does not resolve
    #[error("No such collection, uid = {uid}")]
    CollectionNotFound { uid: String },

    #[error("{op_type} operation not found up chain of file {file_id}")]
    UpChainOperationNotFound { file_id: i64, op_type: OperationKind },

    /// Name missing from a fixed registry
    #[error("Unknown {registry} {name}")]
    UnknownRegistryEntry { registry: &'static str, name: String },

    /// Free UID could not be found within the retry bound
    #[error("No free UID found for {table}")]
    UidExhausted { table: &'static str },

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// mdb-common error
    #[error("Common error: {0}")]
    Common(#[from] mdb_common::Error),
}

impl ApiError {
    /// Validation-class failure caused by the request itself
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            ApiError::FileNotFound { .. }
                | ApiError::FileIdNotFound(_)
                | ApiError::UnknownLanguage(_)
                | ApiError::InvalidSha1(_)
                | ApiError::CollectionNotFound { .. }
                | ApiError::UpChainOperationNotFound { .. }
                | ApiError::UnknownRegistryEntry { .. }
                | ApiError::BadRequest(_)
        )
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::FileNotFound { .. } | ApiError::FileIdNotFound(_) => "FILE_NOT_FOUND",
            ApiError::UnknownLanguage(_) => "UNKNOWN_LANGUAGE",
            ApiError::InvalidSha1(_) => "INVALID_SHA1",
            ApiError::CollectionNotFound { .. } => "COLLECTION_NOT_FOUND",
            ApiError::UpChainOperationNotFound { .. } => "OPERATION_NOT_FOUND",
            ApiError::UnknownRegistryEntry { .. } => "UNKNOWN_REGISTRY_ENTRY",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UidExhausted { .. } | ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Json(_) => "JSON_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.is_bad_input() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
