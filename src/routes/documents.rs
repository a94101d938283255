//! Document routes
//!
//! - POST /api/documents/upload - Upload a PDF (session required)
//! - GET /api/documents - List documents, newest first
//! - GET /api/documents/:id - Document with its pages

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::auth::{require_session, Session};
use crate::db::{Document, DocumentRepository, Page, PageRepository};
use crate::error::{AppError, Result, ValidationError};
use crate::ingest::{check_content_type, IngestOutcome, UploadedFile};
use crate::state::AppState;
use crate::storage::MediaKind;

/// Slack for multipart framing and the title field on top of the file ceiling
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Multipart field carrying the PDF
const FILE_FIELD: &str = "pdf";
const TITLE_FIELD: &str = "title";

// ============================================================================
// Response Types
// ============================================================================

/// A page with the URLs its renditions are served from
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    #[serde(flatten)]
    pub page: Page,
    pub image_url: String,
    pub thumbnail_url: String,
}

impl From<Page> for PageView {
    fn from(page: Page) -> Self {
        Self {
            image_url: page_url(&page, MediaKind::Image),
            thumbnail_url: page_url(&page, MediaKind::Thumbnail),
            page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document: Document,
    pub pages: Vec<PageView>,
}

impl DocumentResponse {
    fn new(document: Document, pages: Vec<Page>) -> Self {
        Self {
            document,
            pages: pages.into_iter().map(PageView::from).collect(),
        }
    }
}

impl From<IngestOutcome> for DocumentResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self::new(outcome.document, outcome.pages)
    }
}

fn page_url(page: &Page, kind: MediaKind) -> String {
    format!(
        "/api/images/{}/{}/{}",
        page.document_id,
        page.page_number,
        kind.route_segment()
    )
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router<AppState> {
    let body_limit = (state.pipeline().max_upload_bytes() + MULTIPART_OVERHEAD) as usize;

    let upload = Router::new()
        .route("/upload", post(upload_document))
        .route_layer(middleware::from_fn_with_state(state, require_session))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/", get(list_documents))
        .route("/:id", get(get_document))
        .merge(upload)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/documents
async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<Document>>> {
    let documents = DocumentRepository::new(state.db()).list().await?;
    Ok(Json(documents))
}

/// GET /api/documents/:id
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>> {
    let document = DocumentRepository::new(state.db())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    let pages = PageRepository::new(state.db())
        .list_for_document(&document.id)
        .await?;

    Ok(Json(DocumentResponse::new(document, pages)))
}

/// POST /api/documents/upload
///
/// Multipart fields: `pdf` (the file) and an optional `title`. The file is
/// streamed to a spool file; ingestion removes it when done.
async fn upload_document(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>> {
    let mut upload: Option<UploadedFile> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            FILE_FIELD => {
                if upload.is_some() {
                    return Err(ValidationError::TooManyFiles.into());
                }
                upload = Some(spool_file(&state, field).await?);
            }
            TITLE_FIELD => title = Some(field.text().await.map_err(read_error)?),
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }

    let upload = upload.ok_or(ValidationError::MissingFile)?;
    tracing::info!(
        user_id = %session.user_id,
        filename = %upload.original_name,
        size = upload.size,
        "Upload received"
    );

    let outcome = state.pipeline().ingest(upload, title).await?;
    Ok(Json(outcome.into()))
}

/// Stream one file field to disk, stopping as soon as it exceeds the ceiling
async fn spool_file(state: &AppState, mut field: Field<'_>) -> Result<UploadedFile> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    // Nothing is written for a file that is not a PDF
    check_content_type(&original_name, content_type.as_deref())?;

    let max = state.pipeline().max_upload_bytes();
    let (temp, mut file) = state.media().create_temp_upload().await?;
    let mut size: u64 = 0;

    while let Some(chunk) = field.chunk().await.map_err(read_error)? {
        size += chunk.len() as u64;
        if size > max {
            // `temp` is dropped here and removes the partial file
            return Err(ValidationError::TooLarge { size, max }.into());
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(UploadedFile {
        temp,
        original_name,
        content_type,
        size,
    })
}

fn read_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(format!("Failed to read upload: {}", e))
}
