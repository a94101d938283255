//! Ingestion types

use std::fmt;

use crate::db::{Document, Page};
use crate::storage::TempUpload;

/// Media type accepted for uploads
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// ============================================================================
// Input / Output
// ============================================================================

/// An upload spooled to disk, waiting to be ingested
#[derive(Debug)]
pub struct UploadedFile {
    /// Spool file, removed when ingestion ends
    pub temp: TempUpload,

    /// File name as sent by the client
    pub original_name: String,

    /// Declared media type, if the client sent one
    pub content_type: Option<String>,

    /// Bytes received
    pub size: u64,
}

/// A successfully ingested document and its pages in page order
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document: Document,
    pub pages: Vec<Page>,
}

// ============================================================================
// Stages
// ============================================================================

/// Ingestion progress, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Validated,
    PageCounted,
    Rasterized,
    FallbackRasterized,
    Persisted,
    CleanedUp,
    Rejected,
    Failed,
}

impl IngestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Validated => "validated",
            IngestStage::PageCounted => "page_counted",
            IngestStage::Rasterized => "rasterized",
            IngestStage::FallbackRasterized => "fallback_rasterized",
            IngestStage::Persisted => "persisted",
            IngestStage::CleanedUp => "cleaned_up",
            IngestStage::Rejected => "rejected",
            IngestStage::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
