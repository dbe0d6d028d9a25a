//! Content graph services

pub mod collection_reconciler;
pub mod file_lineage;
pub mod metadata_processor;
pub mod pipeline;
pub mod publishing;
pub mod up_chain;

pub use metadata_processor::process_metadata;
pub use pipeline::{dispatch, handle_operation};
