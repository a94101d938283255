//! Configuration management for the Flipbook server

use std::env;
use std::path::PathBuf;

/// Upload ceiling: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub ingest: IngestConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Root holding `images/` and `thumbnails/`
    pub root: PathBuf,
    /// Where multipart uploads are spooled before ingestion
    pub upload_dir: PathBuf,
    /// Explicit PDFium library directory; the usual locations are tried otherwise
    pub pdfium_library_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub max_upload_bytes: u64,
    pub render_scale: f32,
    pub thumbnail_ratio: f32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_hours: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            render_scale: 1.5,
            thumbnail_ratio: 0.25,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                url: "sqlite:./flipbook.db".to_string(),
            },
            media: MediaConfig {
                root: PathBuf::from("./public"),
                upload_dir: PathBuf::from("./uploads"),
                pdfium_library_path: None,
            },
            ingest: IngestConfig::default(),
            auth: AuthConfig {
                session_ttl_hours: 24,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.root),
                upload_dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.upload_dir),
                pdfium_library_path: env::var("PDFIUM_LIBRARY_PATH").ok().map(PathBuf::from),
            },
            ingest: IngestConfig {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.ingest.max_upload_bytes)?,
                render_scale: parse_var("RENDER_SCALE", defaults.ingest.render_scale)?,
                thumbnail_ratio: parse_var("THUMBNAIL_RATIO", defaults.ingest.thumbnail_ratio)?,
            },
            auth: AuthConfig {
                session_ttl_hours: parse_var("SESSION_TTL_HOURS", defaults.auth.session_ttl_hours)?,
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
