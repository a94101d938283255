//! Page image routes
//!
//! - GET /api/images/:document_id/:page_number/image
//! - GET /api/images/:document_id/:page_number/thumbnail
//! - GET /api/pages/... redirects to the routes above
//!
//! A known page always gets an image: the stored file, then (thumbnails
//! only) the full image, then a generated placeholder.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use crate::db::PageRepository;
use crate::error::{AppError, Result};
use crate::pdf::placeholder_png;
use crate::state::AppState;
use crate::storage::MediaKind;

const STORED_CACHE_CONTROL: &str = "public, max-age=86400";
const PLACEHOLDER_CACHE_CONTROL: &str = "no-store";

pub fn router() -> Router<AppState> {
    Router::new().route("/:document_id/:page_number/:kind", get(serve_page_image))
}

/// Old `/api/pages/...` paths
pub fn legacy_router() -> Router<AppState> {
    Router::new().route("/:document_id/:page_number/:kind", get(redirect_legacy))
}

fn parse_kind(segment: &str) -> Result<MediaKind> {
    match segment {
        "image" => Ok(MediaKind::Image),
        "thumbnail" => Ok(MediaKind::Thumbnail),
        other => Err(AppError::NotFound(format!("Unknown image kind: {}", other))),
    }
}

fn parse_page_number(segment: &str) -> Result<i64> {
    segment
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid page number: {}", segment)))
}

/// GET /api/images/:document_id/:page_number/:kind
async fn serve_page_image(
    State(state): State<AppState>,
    Path((document_id, page_number, kind)): Path<(String, String, String)>,
) -> Result<Response> {
    let page_number = parse_page_number(&page_number)?;
    let kind = parse_kind(&kind)?;

    let page = PageRepository::new(state.db())
        .get(&document_id, page_number)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))?;

    let mut candidates = vec![match kind {
        MediaKind::Image => page.image_path.as_str(),
        MediaKind::Thumbnail => page.thumbnail_path.as_str(),
    }];
    if kind == MediaKind::Thumbnail {
        candidates.push(page.image_path.as_str());
    }

    for key in candidates {
        match state.media().read(key).await {
            Ok(Some(bytes)) => {
                let content_type = mime_guess::from_path(key).first_or_octet_stream();
                return Ok((
                    [
                        (header::CONTENT_TYPE, content_type.essence_str().to_string()),
                        (header::CACHE_CONTROL, STORED_CACHE_CONTROL.to_string()),
                    ],
                    bytes,
                )
                    .into_response());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key, "Failed to read stored image: {}", e),
        }
    }

    tracing::debug!(
        document_id = %document_id,
        page = page_number,
        kind = kind.route_segment(),
        "Serving placeholder image"
    );

    let number = page_number as usize;
    let bytes = tokio::task::spawn_blocking(move || placeholder_png(number, kind))
        .await
        .map_err(|e| AppError::Internal(format!("Placeholder task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Failed to draw placeholder: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, PLACEHOLDER_CACHE_CONTROL.to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// GET /api/pages/:document_id/:page_number/:kind
async fn redirect_legacy(Path((document_id, page_number, kind)): Path<(String, String, String)>) -> Result<Redirect> {
    let page_number = parse_page_number(&page_number)?;
    let kind = parse_kind(&kind)?;
    Ok(Redirect::temporary(&format!(
        "/api/images/{}/{}/{}",
        document_id,
        page_number,
        kind.route_segment()
    )))
}
