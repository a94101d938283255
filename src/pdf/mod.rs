//! PDF handling
//!
//! - `page_count`: page-count detection from raw bytes
//! - `backend`: render backend seam and the pdfium implementation
//! - `rasterizer`: page images and thumbnails with per-page fallback
//! - `placeholder`: generated stand-in page images

mod backend;
mod page_count;
mod placeholder;
mod rasterizer;

pub use backend::{PageSink, PdfiumBackend, RenderBackend};
pub use page_count::{detect_page_count, PageCountError, MAX_PAGE_COUNT};
pub use placeholder::{generate_placeholders, placeholder_png, PAGE_SIZE, THUMBNAIL_SIZE};
pub use rasterizer::{thumbnail_dimensions, RasterSettings, RasterizeError, Rasterizer};

#[cfg(test)]
pub(crate) use rasterizer::test_support::FakeBackend;
