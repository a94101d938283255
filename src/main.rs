//! Flipbook Server
//!
//! Accepts PDF uploads, renders every page to an image and thumbnail, and
//! serves documents and page images to the flipbook viewer.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flipbook_server::auth::{InMemorySessionStore, SessionStore};
use flipbook_server::config::Config;
use flipbook_server::db;
use flipbook_server::pdf::PdfiumBackend;
use flipbook_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flipbook_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Flipbook Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Media root: {}", config.media.root.display());

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    tracing::info!("Database initialized at {}", config.database.url);

    // Session registry
    let sessions = Arc::new(InMemorySessionStore::with_ttl_hours(config.auth.session_ttl_hours));
    sessions.init().await.context("Failed to open session registry")?;

    // Application state
    let backend = Arc::new(PdfiumBackend::new(config.media.pdfium_library_path.clone()));
    let app_state = AppState::new(&config, db_pool, sessions.clone(), backend);
    app_state
        .media()
        .ensure_dirs()
        .await
        .context("Failed to create media directories")?;

    let app = flipbook_server::app(app_state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("Flipbook Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sessions.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
