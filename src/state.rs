//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::SessionStore;
use crate::config::Config;
use crate::ingest::IngestionPipeline;
use crate::pdf::{RasterSettings, Rasterizer, RenderBackend};
use crate::storage::MediaStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: SqlitePool,
    media: MediaStore,
    sessions: Arc<dyn SessionStore>,
    pipeline: IngestionPipeline,
}

impl AppState {
    /// Wire up the media store, rasterizer and ingestion pipeline
    pub fn new(
        config: &Config,
        db: SqlitePool,
        sessions: Arc<dyn SessionStore>,
        backend: Arc<dyn RenderBackend>,
    ) -> Self {
        let media = MediaStore::new(config.media.root.clone(), config.media.upload_dir.clone());
        let rasterizer = Rasterizer::new(backend, media.clone(), RasterSettings::from(&config.ingest));
        let pipeline = IngestionPipeline::new(db.clone(), media.clone(), rasterizer, &config.ingest);

        Self {
            inner: Arc::new(AppStateInner {
                db,
                media,
                sessions,
                pipeline,
            }),
        }
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the media store
    pub fn media(&self) -> &MediaStore {
        &self.inner.media
    }

    /// Get the session registry
    pub fn sessions(&self) -> &dyn SessionStore {
        self.inner.sessions.as_ref()
    }

    /// Get the ingestion pipeline
    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.inner.pipeline
    }
}
