//! PDF render backends
//!
//! The rasterizer only sees [`RenderBackend`]; the pdfium binding lives here.

use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;

use super::rasterizer::RasterizeError;

/// Callback receiving each page (1-based) as it is rendered
pub type PageSink<'a> = dyn FnMut(usize, Result<DynamicImage, RasterizeError>) + 'a;

/// Renders every page of a PDF to a raster
///
/// Returns the number of pages in the document. A page that fails to render
/// is reported through `on_page` and does not stop the batch; an `Err` return
/// means nothing could be rendered at all.
pub trait RenderBackend: Send + Sync {
    fn render_pages(
        &self,
        pdf: &[u8],
        scale: f32,
        on_page: &mut PageSink<'_>,
    ) -> Result<usize, RasterizeError>;
}

/// pdfium-backed renderer
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    /// Directories searched for the pdfium shared library, in order
    fn search_dirs(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self
            .library_dir
            .iter()
            .map(|dir| dir.to_string_lossy().to_string())
            .collect();
        dirs.extend(["./", "/usr/lib", "/usr/local/lib"].map(String::from));
        dirs
    }

    fn bind(&self) -> Result<Pdfium, RasterizeError> {
        for dir in self.search_dirs() {
            if let Ok(bindings) =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir.as_str()))
            {
                return Ok(Pdfium::new(bindings));
            }
        }

        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| RasterizeError::BackendUnavailable(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl RenderBackend for PdfiumBackend {
    fn render_pages(
        &self,
        pdf: &[u8],
        scale: f32,
        on_page: &mut PageSink<'_>,
    ) -> Result<usize, RasterizeError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RasterizeError::LoadFailed(e.to_string()))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let pages = document.pages();
        let page_count = pages.len() as usize;

        for (index, page) in pages.iter().enumerate() {
            let page_number = index + 1;
            let result = page
                .render_with_config(&config)
                .map(|bitmap| bitmap.as_image())
                .map_err(|e| RasterizeError::Page {
                    page: page_number,
                    message: e.to_string(),
                });
            on_page(page_number, result);
        }

        Ok(page_count)
    }
}
