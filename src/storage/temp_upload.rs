//! Spooled upload file with guaranteed removal
//!
//! The file is removed by [`TempUpload::cleanup`] on normal exits and by
//! `Drop` on every other path (early return, panic, dropped future).

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    armed: bool,
}

impl TempUpload {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now. Failures are logged, never returned.
    pub async fn cleanup(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary upload"),
            Err(e) => log_removal_failure(&self.path, e),
        }
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary upload on drop"),
            Err(e) => log_removal_failure(&self.path, e),
        }
    }
}

fn log_removal_failure(path: &Path, e: io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        return;
    }
    tracing::warn!(path = %path.display(), "Failed to remove temporary upload: {}", e);
}
