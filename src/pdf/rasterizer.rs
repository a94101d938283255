//! Page rasterizer
//!
//! Renders every page of a PDF to a full-size PNG and a thumbnail under the
//! media root. Per-page failures are replaced by placeholders; only a failure
//! of the whole batch is reported to the caller.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

use super::backend::RenderBackend;
use super::placeholder::{generate_placeholders, write_placeholder_pair};
use crate::config::IngestConfig;
use crate::storage::{MediaKind, MediaStore, PagePaths};

#[derive(Error, Debug)]
pub enum RasterizeError {
    #[error("PDF renderer unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Failed to load PDF: {0}")]
    LoadFailed(String),

    #[error("Failed to render page {page}: {message}")]
    Page { page: usize, message: String },

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// Rendering parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterSettings {
    pub scale: f32,
    pub thumbnail_ratio: f32,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            scale: 1.5,
            thumbnail_ratio: 0.25,
        }
    }
}

impl From<&IngestConfig> for RasterSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            scale: config.render_scale,
            thumbnail_ratio: config.thumbnail_ratio,
        }
    }
}

/// Thumbnail size for a raster, never below 1x1
pub fn thumbnail_dimensions(width: u32, height: u32, ratio: f32) -> (u32, u32) {
    let scaled = |v: u32| ((v as f32 * ratio).round() as u32).max(1);
    (scaled(width), scaled(height))
}

#[derive(Clone)]
pub struct Rasterizer {
    backend: Arc<dyn RenderBackend>,
    media: MediaStore,
    settings: RasterSettings,
}

impl Rasterizer {
    pub fn new(backend: Arc<dyn RenderBackend>, media: MediaStore, settings: RasterSettings) -> Self {
        Self {
            backend,
            media,
            settings,
        }
    }

    /// Render `pdf` into the namespace of `document_id`
    ///
    /// Returns one image and one thumbnail path per page, in page order.
    pub async fn rasterize(&self, pdf: Vec<u8>, document_id: &str) -> Result<PagePaths, RasterizeError> {
        let backend = Arc::clone(&self.backend);
        let media = self.media.clone();
        let settings = self.settings;
        let document_id = document_id.to_string();

        tokio::task::spawn_blocking(move || {
            rasterize_blocking(backend.as_ref(), &media, settings, &pdf, &document_id)
        })
        .await
        .map_err(|e| RasterizeError::Task(e.to_string()))?
    }

    /// Placeholder pages for a whole document; never fails
    pub async fn placeholders(&self, document_id: &str, page_count: usize) -> PagePaths {
        let media = self.media.clone();
        let id = document_id.to_string();

        match tokio::task::spawn_blocking(move || generate_placeholders(&media, &id, page_count)).await {
            Ok(paths) => paths,
            Err(e) => {
                tracing::error!(document_id, "Placeholder task failed: {}", e);
                let mut paths = PagePaths::with_capacity(page_count);
                for n in 1..=page_count {
                    paths.push(
                        self.media.page_key(MediaKind::Image, document_id, n),
                        self.media.page_key(MediaKind::Thumbnail, document_id, n),
                    );
                }
                paths
            }
        }
    }
}

fn rasterize_blocking(
    backend: &dyn RenderBackend,
    media: &MediaStore,
    settings: RasterSettings,
    pdf: &[u8],
    document_id: &str,
) -> Result<PagePaths, RasterizeError> {
    std::fs::create_dir_all(media.document_dir(MediaKind::Image, document_id))?;
    std::fs::create_dir_all(media.document_dir(MediaKind::Thumbnail, document_id))?;

    let mut written = BTreeSet::new();
    let mut substituted = 0usize;

    let mut on_page = |page_number: usize, result: Result<DynamicImage, RasterizeError>| {
        let outcome = result.and_then(|img| write_page(media, settings, document_id, page_number, &img));
        if let Err(e) = outcome {
            tracing::warn!(document_id, page = page_number, "Page render failed, using placeholder: {}", e);
            substitute(media, document_id, page_number);
            substituted += 1;
        }
        written.insert(page_number);
    };

    let page_count = backend.render_pages(pdf, settings.scale, &mut on_page)?;
    if page_count == 0 {
        return Err(RasterizeError::LoadFailed("document has no pages".to_string()));
    }

    let mut paths = PagePaths::with_capacity(page_count);
    for page_number in 1..=page_count {
        if !written.contains(&page_number) {
            tracing::warn!(document_id, page = page_number, "Page not rendered, using placeholder");
            substitute(media, document_id, page_number);
            substituted += 1;
        }
        paths.push(
            media.page_key(MediaKind::Image, document_id, page_number),
            media.page_key(MediaKind::Thumbnail, document_id, page_number),
        );
    }

    tracing::info!(document_id, page_count, substituted, "Rasterized document");
    Ok(paths)
}

fn write_page(
    media: &MediaStore,
    settings: RasterSettings,
    document_id: &str,
    page_number: usize,
    img: &DynamicImage,
) -> Result<(), RasterizeError> {
    img.save_with_format(
        media.page_path(MediaKind::Image, document_id, page_number),
        ImageFormat::Png,
    )?;

    let (width, height) = thumbnail_dimensions(img.width(), img.height(), settings.thumbnail_ratio);
    img.resize_exact(width, height, FilterType::Triangle).save_with_format(
        media.page_path(MediaKind::Thumbnail, document_id, page_number),
        ImageFormat::Png,
    )?;

    tracing::debug!(document_id, page = page_number, "Wrote page images");
    Ok(())
}

fn substitute(media: &MediaStore, document_id: &str, page_number: usize) {
    if let Err(e) = write_placeholder_pair(media, document_id, page_number) {
        tracing::warn!(document_id, page = page_number, "Failed to write placeholder: {}", e);
    }
}
