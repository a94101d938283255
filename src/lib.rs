//! Flipbook Server Library
//!
//! Turns uploaded PDFs into page images and serves them to a flipbook viewer.
//!
//! # Modules
//!
//! - `ingest`: upload validation, page counting, rendering and persistence
//! - `pdf`: page-count detection, rasterization and placeholders
//! - `db`: SQLite store for documents, pages and users
//! - `storage`: on-disk media layout and spooled uploads
//! - `auth`: sessions and password hashing
//! - `routes`: HTTP handlers

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;

use state::AppState;

/// Build the HTTP application
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/health", get(routes::health::health_check))
        .nest("/api/documents", routes::documents::router(state.clone()))
        .nest("/api/images", routes::images::router())
        .nest("/api/pages", routes::images::legacy_router())
        .nest("/api/user", routes::auth::user_router())
        .nest("/api/auth", routes::auth::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
