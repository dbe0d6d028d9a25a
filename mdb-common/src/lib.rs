//! # MDB Common Library
//!
//! Shared code for the MDB content graph services:
//! - Database schema creation and row models
//! - Fixed lookup registries (operation types, content types, roles)
//! - Static tables for languages and media types
//! - Property bag merge semantics
//! - Short UID generation
//! - Bootstrap configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod languages;
pub mod media_types;
pub mod properties;
pub mod registry;
pub mod uid_utils;

pub use error::{Error, Result};
pub use properties::Properties;
pub use registry::Registries;
