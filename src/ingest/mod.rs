//! Upload ingestion
//!
//! Turns a spooled PDF upload into a stored document with rendered pages.

mod pipeline;
mod types;

pub use pipeline::{check_content_type, derive_title, validate_upload, IngestionPipeline};
pub use types::*;
