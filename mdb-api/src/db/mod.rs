//! Database operations for the content graph
//!
//! Every function takes a connection so it can run inside the per-event
//! transaction (`&mut *tx`) as well as on a plain pooled connection.

pub mod catalog;
pub mod collections;
pub mod content_units;
pub mod files;
pub mod operations;
pub mod uids;
