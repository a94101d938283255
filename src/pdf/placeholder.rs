//! Placeholder page images
//!
//! A light canvas with a border and a `PAGE <n>` label, drawn with a small
//! built-in bitmap font. Stands in for any page that could not be rendered.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::rasterizer::RasterizeError;
use crate::storage::{MediaKind, MediaStore, PagePaths};

/// Full-size placeholder dimensions
pub const PAGE_SIZE: (u32, u32) = (800, 1000);
/// Thumbnail placeholder dimensions
pub const THUMBNAIL_SIZE: (u32, u32) = (200, 250);

const BACKGROUND: Rgba<u8> = Rgba([0xF3, 0xF4, 0xF6, 0xFF]);
const BORDER: Rgba<u8> = Rgba([0xD1, 0xD5, 0xDB, 0xFF]);
const INK: Rgba<u8> = Rgba([0x37, 0x41, 0x51, 0xFF]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Glyph advance including one column of spacing
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// 5x7 rows, most significant of the low five bits is the leftmost column
fn glyph(c: char) -> [u8; 7] {
    match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        _ => [0; 7],
    }
}

/// Draw a placeholder for `page_number` at the given size
pub fn placeholder_image(page_number: usize, width: u32, height: u32) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    let border = (width.min(height) / 100).max(1);
    for y in 0..height {
        for x in 0..width {
            if x < border || y < border || x >= width - border || y >= height - border {
                img.put_pixel(x, y, BORDER);
            }
        }
    }

    let label = format!("PAGE {}", page_number);
    let cells = label.chars().count() as u32 * GLYPH_ADVANCE - 1;
    let scale = ((width * 3 / 5) / cells).clamp(1, (height / 4 / GLYPH_HEIGHT).max(1));

    let text_width = cells * scale;
    let text_height = GLYPH_HEIGHT * scale;
    let origin_x = width.saturating_sub(text_width) / 2;
    let origin_y = height.saturating_sub(text_height) / 2;

    for (index, c) in label.chars().enumerate() {
        let glyph_x = origin_x + index as u32 * GLYPH_ADVANCE * scale;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                fill_rect(
                    &mut img,
                    glyph_x + col * scale,
                    origin_y + row as u32 * scale,
                    scale,
                    INK,
                );
            }
        }
    }

    img
}

fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, size: u32, color: Rgba<u8>) {
    for y in y0..(y0 + size).min(img.height()) {
        for x in x0..(x0 + size).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Dimensions used for a placeholder of the given rendition
pub fn placeholder_size(kind: MediaKind) -> (u32, u32) {
    match kind {
        MediaKind::Image => PAGE_SIZE,
        MediaKind::Thumbnail => THUMBNAIL_SIZE,
    }
}

/// PNG bytes of a placeholder, for serving directly
pub fn placeholder_png(page_number: usize, kind: MediaKind) -> Result<Vec<u8>, RasterizeError> {
    let (width, height) = placeholder_size(kind);
    let img = DynamicImage::ImageRgba8(placeholder_image(page_number, width, height));

    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

/// Write the image and thumbnail placeholders for one page
pub fn write_placeholder_pair(
    media: &MediaStore,
    document_id: &str,
    page_number: usize,
) -> Result<(), RasterizeError> {
    for kind in [MediaKind::Image, MediaKind::Thumbnail] {
        let (width, height) = placeholder_size(kind);
        let path = media.page_path(kind, document_id, page_number);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        placeholder_image(page_number, width, height).save_with_format(&path, ImageFormat::Png)?;
    }
    Ok(())
}

/// Placeholders for every page of a document
///
/// Never fails: a page whose files cannot be written is logged and its paths
/// are still returned, the image routes draw placeholders on demand.
pub fn generate_placeholders(media: &MediaStore, document_id: &str, page_count: usize) -> PagePaths {
    let mut paths = PagePaths::with_capacity(page_count);

    for page_number in 1..=page_count {
        if let Err(e) = write_placeholder_pair(media, document_id, page_number) {
            tracing::warn!(
                document_id,
                page = page_number,
                "Failed to write placeholder: {}",
                e
            );
        }
        paths.push(
            media.page_key(MediaKind::Image, document_id, page_number),
            media.page_key(MediaKind::Thumbnail, document_id, page_number),
        );
    }

    tracing::info!(document_id, page_count, "Generated placeholder pages");
    paths
}
