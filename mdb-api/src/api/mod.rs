//! HTTP transport for the content graph core
//!
//! Thin axum handlers: each decodes a request, runs the matching service
//! inside one transaction and encodes the outcome.

pub mod files;
pub mod health;
pub mod operations;

pub use files::file_routes;
pub use health::health_routes;
pub use operations::operation_routes;
