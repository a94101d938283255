//! Document ingestion pipeline
//!
//! Received -> Validated -> PageCounted -> Rasterized | FallbackRasterized
//! -> Persisted -> CleanedUp, with `Rejected` for client errors and `Failed`
//! for everything else. The spooled upload is removed on every exit.

use sqlx::SqlitePool;

use super::types::{IngestOutcome, IngestStage, UploadedFile, PDF_CONTENT_TYPE};
use crate::config::IngestConfig;
use crate::db::{Document, DocumentRepository, NewDocument, NewPage, Page, PageRepository};
use crate::error::{AppError, Result, ValidationError};
use crate::pdf::{detect_page_count, Rasterizer};
use crate::storage::{MediaStore, PagePaths, TempUpload};

#[derive(Clone)]
pub struct IngestionPipeline {
    pool: SqlitePool,
    media: MediaStore,
    rasterizer: Rasterizer,
    max_upload_bytes: u64,
}

impl IngestionPipeline {
    pub fn new(pool: SqlitePool, media: MediaStore, rasterizer: Rasterizer, config: &IngestConfig) -> Self {
        Self {
            pool,
            media,
            rasterizer,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Ingest one uploaded PDF
    pub async fn ingest(&self, upload: UploadedFile, title: Option<String>) -> Result<IngestOutcome> {
        let UploadedFile {
            temp,
            original_name,
            content_type,
            size,
        } = upload;

        log_stage(IngestStage::Received, None);
        tracing::info!(filename = %original_name, size, "Received upload");

        let result = self
            .run(&temp, &original_name, content_type.as_deref(), size, title.as_deref())
            .await;

        match &result {
            Ok(_) => {}
            Err(e @ (AppError::Validation(_) | AppError::UnreadablePdf(_))) => {
                tracing::info!(stage = %IngestStage::Rejected, filename = %original_name, "Upload rejected: {}", e);
            }
            Err(e) => {
                tracing::error!(stage = %IngestStage::Failed, filename = %original_name, "Ingestion failed: {}", e);
            }
        }

        temp.cleanup().await;
        log_stage(IngestStage::CleanedUp, None);

        result
    }

    async fn run(
        &self,
        temp: &TempUpload,
        original_name: &str,
        content_type: Option<&str>,
        size: u64,
        title: Option<&str>,
    ) -> Result<IngestOutcome> {
        let title = validate_upload(original_name, content_type, size, title, self.max_upload_bytes)?;

        // Trust what is on disk over the declared size
        let pdf = tokio::fs::read(temp.path()).await?;
        check_size(pdf.len() as u64, self.max_upload_bytes)?;
        log_stage(IngestStage::Validated, None);

        let page_count = detect_page_count(&pdf).map_err(|e| AppError::UnreadablePdf(e.to_string()))?;
        tracing::info!(stage = %IngestStage::PageCounted, page_count, "Detected page count");

        let document = DocumentRepository::new(&self.pool)
            .create(&NewDocument {
                title,
                filename: original_name.to_string(),
                page_count: page_count as i64,
            })
            .await?;

        match self.render_and_persist(&document, pdf, page_count).await {
            Ok(pages) => Ok(IngestOutcome { document, pages }),
            Err(e) => {
                self.rollback(&document.id).await;
                Err(e)
            }
        }
    }

    async fn render_and_persist(&self, document: &Document, pdf: Vec<u8>, page_count: usize) -> Result<Vec<Page>> {
        let paths = self.rasterize_or_fallback(&document.id, pdf, page_count).await;

        if !paths.matches(page_count) {
            return Err(AppError::Internal(format!(
                "Page output mismatch for document {}: expected {}, got {} images and {} thumbnails",
                document.id,
                page_count,
                paths.image_paths.len(),
                paths.thumbnail_paths.len()
            )));
        }

        let new_pages: Vec<NewPage> = paths
            .image_paths
            .into_iter()
            .zip(paths.thumbnail_paths)
            .enumerate()
            .map(|(index, (image_path, thumbnail_path))| NewPage {
                page_number: index as i64 + 1,
                image_path,
                thumbnail_path,
            })
            .collect();

        let pages = PageRepository::new(&self.pool)
            .create_all(&document.id, &new_pages)
            .await?;
        log_stage(IngestStage::Persisted, Some(&document.id));

        Ok(pages)
    }

    async fn rasterize_or_fallback(&self, document_id: &str, pdf: Vec<u8>, page_count: usize) -> PagePaths {
        match self.rasterizer.rasterize(pdf, document_id).await {
            Ok(paths) if paths.matches(page_count) => {
                log_stage(IngestStage::Rasterized, Some(document_id));
                return paths;
            }
            Ok(paths) => tracing::warn!(
                document_id,
                expected = page_count,
                rendered = paths.image_paths.len(),
                "Rendered page count differs from detected count, using placeholders"
            ),
            Err(e) => tracing::warn!(document_id, "Rasterization failed, using placeholders: {}", e),
        }

        let paths = self.rasterizer.placeholders(document_id, page_count).await;
        log_stage(IngestStage::FallbackRasterized, Some(document_id));
        paths
    }

    /// Remove a document whose pages could not be persisted
    async fn rollback(&self, document_id: &str) {
        match DocumentRepository::new(&self.pool).delete(document_id).await {
            Ok(_) => tracing::info!(document_id, "Rolled back document"),
            Err(e) => tracing::error!(document_id, "Failed to roll back document: {}", e),
        }
        self.media.remove_document(document_id).await;
    }
}

fn log_stage(stage: IngestStage, document_id: Option<&str>) {
    match document_id {
        Some(id) => tracing::debug!(stage = %stage, document_id = id, "Ingestion stage"),
        None => tracing::debug!(stage = %stage, "Ingestion stage"),
    }
}

/// Check an upload's declared shape and settle its title
///
/// The type check comes first so nothing else looks at a non-PDF.
pub fn validate_upload(
    original_name: &str,
    content_type: Option<&str>,
    size: u64,
    title: Option<&str>,
    max_upload_bytes: u64,
) -> std::result::Result<String, ValidationError> {
    check_content_type(original_name, content_type)?;
    check_size(size, max_upload_bytes)?;

    derive_title(title, original_name).ok_or(ValidationError::MissingTitle)
}

/// Reject anything not declared as a PDF
///
/// Without a declared type the file name decides.
pub fn check_content_type(original_name: &str, content_type: Option<&str>) -> std::result::Result<(), ValidationError> {
    let declared = match content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
        Some(ct) => ct.to_string(),
        None => mime_guess::from_path(original_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    };

    if is_pdf_type(&declared) {
        Ok(())
    } else {
        Err(ValidationError::WrongType(declared))
    }
}

fn check_size(size: u64, max: u64) -> std::result::Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::Empty);
    }
    if size > max {
        return Err(ValidationError::TooLarge { size, max });
    }
    Ok(())
}

fn is_pdf_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE))
        .unwrap_or(false)
}

/// The supplied title, or the file name without its last extension
pub fn derive_title(title: Option<&str>, filename: &str) -> Option<String> {
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(title.to_string());
    }

    let name = filename.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(filename);
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };

    let stem = stem.trim();
    (!stem.is_empty()).then(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    use crate::db::test_support::pool_in;
    use crate::pdf::{FakeBackend, RasterSettings, PAGE_SIZE};
    use crate::storage::MediaKind;

    const THREE_PAGES: &[u8] =
        b"%PDF-1.4\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n2 0 obj << /Type /Pages /Count 3 >> endobj\n%%EOF";

    struct Harness {
        _dir: TempDir,
        pool: SqlitePool,
        media: MediaStore,
        pipeline: IngestionPipeline,
    }

    async fn harness_with(backend: FakeBackend, max_upload_bytes: u64) -> Harness {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let media = MediaStore::new(dir.path().join("public"), dir.path().join("uploads"));
        media.ensure_dirs().await.unwrap();

        let rasterizer = Rasterizer::new(Arc::new(backend), media.clone(), RasterSettings::default());
        let config = IngestConfig {
            max_upload_bytes,
            ..IngestConfig::default()
        };
        let pipeline = IngestionPipeline::new(pool.clone(), media.clone(), rasterizer, &config);

        Harness {
            _dir: dir,
            pool,
            media,
            pipeline,
        }
    }

    async fn harness(backend: FakeBackend) -> Harness {
        harness_with(backend, IngestConfig::default().max_upload_bytes).await
    }

    async fn spool(media: &MediaStore, bytes: &[u8], name: &str, content_type: Option<&str>) -> (UploadedFile, PathBuf) {
        let (temp, mut file) = media.create_temp_upload().await.unwrap();
        file.write_all(bytes).await.unwrap();
        file.flush().await.unwrap();
        let path = temp.path().to_path_buf();

        let upload = UploadedFile {
            temp,
            original_name: name.to_string(),
            content_type: content_type.map(String::from),
            size: bytes.len() as u64,
        };
        (upload, path)
    }

    async fn document_count(pool: &SqlitePool) -> usize {
        DocumentRepository::new(pool).list().await.unwrap().len()
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title(Some("  Report "), "x.pdf"), Some("Report".to_string()));
        assert_eq!(derive_title(None, "annual.report.pdf"), Some("annual.report".to_string()));
        assert_eq!(derive_title(Some("   "), "C:\\docs\\q3.pdf"), Some("q3".to_string()));
        assert_eq!(derive_title(None, "README"), Some("README".to_string()));
        assert_eq!(derive_title(Some(""), ".pdf"), None);
        assert_eq!(derive_title(None, ""), None);
    }

    #[test]
    fn test_validate_upload_order() {
        let max = 100;
        // Wrong type wins even when the file is also empty
        assert_eq!(
            validate_upload("a.txt", Some("text/plain"), 0, None, max),
            Err(ValidationError::WrongType("text/plain".to_string()))
        );
        assert_eq!(
            validate_upload("a.pdf", Some("application/pdf"), 0, None, max),
            Err(ValidationError::Empty)
        );
        assert_eq!(
            validate_upload("a.pdf", Some("application/pdf"), 101, None, max),
            Err(ValidationError::TooLarge { size: 101, max: 100 })
        );
        assert_eq!(
            validate_upload(".pdf", Some("application/pdf"), 10, Some(" "), max),
            Err(ValidationError::MissingTitle)
        );
        assert_eq!(
            validate_upload("a.pdf", Some("Application/PDF; charset=binary"), 10, None, max),
            Ok("a".to_string())
        );
    }

    #[test]
    fn test_validate_upload_guesses_missing_type() {
        assert_eq!(validate_upload("scan.pdf", None, 10, None, 100), Ok("scan".to_string()));
        assert!(matches!(
            validate_upload("scan.png", Some(""), 10, None, 100),
            Err(ValidationError::WrongType(_))
        ));
        assert!(matches!(
            validate_upload("noextension", None, 10, None, 100),
            Err(ValidationError::WrongType(_))
        ));
    }

    #[tokio::test]
    async fn test_three_page_report() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (upload, spooled) = spool(&h.media, THREE_PAGES, "report.pdf", Some("application/pdf")).await;

        let outcome = h.pipeline.ingest(upload, Some("Report".to_string())).await.unwrap();

        assert_eq!(outcome.document.title, "Report");
        assert_eq!(outcome.document.filename, "report.pdf");
        assert_eq!(outcome.document.page_count, 3);
        assert_eq!(outcome.pages.len(), 3);
        for (i, page) in outcome.pages.iter().enumerate() {
            assert_eq!(page.page_number, i as i64 + 1);
            assert!(!page.image_path.is_empty());
            assert!(!page.thumbnail_path.is_empty());
            assert_ne!(page.image_path, page.thumbnail_path);
        }
        let distinct: std::collections::HashSet<_> = outcome.pages.iter().map(|p| &p.image_path).collect();
        assert_eq!(distinct.len(), 3);

        assert!(!spooled.exists());

        let stored = PageRepository::new(&h.pool)
            .list_for_document(&outcome.document.id)
            .await
            .unwrap();
        assert_eq!(stored, outcome.pages);
    }

    #[tokio::test]
    async fn test_whole_batch_failure_falls_back_to_placeholders() {
        let h = harness(FakeBackend::Broken).await;
        let (upload, spooled) = spool(&h.media, THREE_PAGES, "broken.pdf", Some("application/pdf")).await;

        let outcome = h.pipeline.ingest(upload, None).await.unwrap();

        assert_eq!(outcome.document.title, "broken");
        assert_eq!(outcome.pages.len(), 3);
        for page in &outcome.pages {
            let path = h.media.resolve(&page.image_path).unwrap();
            let img = image::open(path).unwrap();
            assert_eq!((img.width(), img.height()), PAGE_SIZE);
        }
        assert!(!spooled.exists());
    }

    #[tokio::test]
    async fn test_count_mismatch_falls_back_to_placeholders() {
        // Backend sees two pages, the byte scan says three
        let h = harness(FakeBackend::Pages(2)).await;
        let (upload, _) = spool(&h.media, THREE_PAGES, "short.pdf", Some("application/pdf")).await;

        let outcome = h.pipeline.ingest(upload, None).await.unwrap();

        assert_eq!(outcome.pages.len(), 3);
        let third = h.media.page_path(MediaKind::Thumbnail, &outcome.document.id, 3);
        assert!(third.exists());
    }

    #[tokio::test]
    async fn test_failed_page_keeps_total() {
        let h = harness(FakeBackend::Failing(3, vec![2])).await;
        let (upload, _) = spool(&h.media, THREE_PAGES, "partial.pdf", Some("application/pdf")).await;

        let outcome = h.pipeline.ingest(upload, None).await.unwrap();
        assert_eq!(outcome.pages.len(), 3);

        let rendered = image::open(h.media.resolve(&outcome.pages[0].image_path).unwrap()).unwrap();
        let placeholder = image::open(h.media.resolve(&outcome.pages[1].image_path).unwrap()).unwrap();
        assert_ne!(
            (rendered.width(), rendered.height()),
            (placeholder.width(), placeholder.height())
        );
    }

    #[tokio::test]
    async fn test_wrong_type_rejected_before_reading() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (upload, spooled) = spool(&h.media, b"not a pdf", "notes.txt", Some("text/plain")).await;

        let err = h.pipeline.ingest(upload, Some("Notes".to_string())).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::WrongType(_))));
        assert!(!spooled.exists());
        assert_eq!(document_count(&h.pool).await, 0);
    }

    #[tokio::test]
    async fn test_too_large_rejected() {
        let h = harness_with(FakeBackend::Pages(3), 16).await;
        let (upload, spooled) = spool(&h.media, THREE_PAGES, "big.pdf", Some("application/pdf")).await;

        let err = h.pipeline.ingest(upload, None).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::TooLarge { .. })));
        assert!(!spooled.exists());
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (upload, spooled) = spool(&h.media, b"", "empty.pdf", Some("application/pdf")).await;

        let err = h.pipeline.ingest(upload, Some("Empty".to_string())).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::Empty)));
        assert!(!spooled.exists());
        assert_eq!(document_count(&h.pool).await, 0);
    }

    #[tokio::test]
    async fn test_declared_size_is_not_trusted() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (mut upload, _) = spool(&h.media, b"", "liar.pdf", Some("application/pdf")).await;
        upload.size = 1024;

        let err = h.pipeline.ingest(upload, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::Empty)));
    }

    #[tokio::test]
    async fn test_missing_title_rejected() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (upload, spooled) = spool(&h.media, THREE_PAGES, ".pdf", Some("application/pdf")).await;

        let err = h.pipeline.ingest(upload, Some("  ".to_string())).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::MissingTitle)));
        assert!(!spooled.exists());
    }

    #[tokio::test]
    async fn test_unreadable_pdf_rejected() {
        let h = harness(FakeBackend::Pages(3)).await;
        let (upload, spooled) = spool(&h.media, b"%PDF-1.4 garbage", "bad.pdf", Some("application/pdf")).await;

        let err = h.pipeline.ingest(upload, None).await.unwrap_err();

        assert!(matches!(err, AppError::UnreadablePdf(_)));
        assert!(!spooled.exists());
        assert_eq!(document_count(&h.pool).await, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back() {
        let h = harness(FakeBackend::Pages(3)).await;
        sqlx::query("DROP TABLE pages").execute(&h.pool).await.unwrap();
        let (upload, spooled) = spool(&h.media, THREE_PAGES, "doomed.pdf", Some("application/pdf")).await;

        let err = h.pipeline.ingest(upload, None).await.unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(document_count(&h.pool).await, 0);
        assert!(!spooled.exists());

        let leftovers = std::fs::read_dir(h.media.root().join("images")).unwrap().count();
        assert_eq!(leftovers, 0);
    }
}
