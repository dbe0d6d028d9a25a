//! Errors raised by the shared storage and bootstrap layer

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures below the service layer
#[derive(Error, Debug)]
pub enum Error {
    /// Query or row decoding failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the database directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored property bag is not a JSON object
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bootstrap TOML file unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}
