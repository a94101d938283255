//! Local media store
//!
//! Layout under the media root:
//!
//! ```text
//! images/<document_id>/page-<n>.png
//! thumbnails/<document_id>/page-<n>.png
//! ```
//!
//! Stored page paths are keys relative to the root so the root can move
//! without touching the database.

use std::io;
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use super::temp_upload::TempUpload;
use super::types::MediaKind;

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    upload_dir: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            upload_dir: upload_dir.into(),
        }
    }

    /// Create the top-level directories
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.join(MediaKind::Image.dir_name())).await?;
        tokio::fs::create_dir_all(self.root.join(MediaKind::Thumbnail.dir_name())).await?;
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Key of a page rendition, relative to the media root
    pub fn page_key(&self, kind: MediaKind, document_id: &str, page_number: usize) -> String {
        format!("{}/{}/page-{}.png", kind.dir_name(), document_id, page_number)
    }

    /// Absolute location of a page rendition
    pub fn page_path(&self, kind: MediaKind, document_id: &str, page_number: usize) -> PathBuf {
        self.root.join(self.page_key(kind, document_id, page_number))
    }

    /// Directory holding one document's renditions of `kind`
    pub fn document_dir(&self, kind: MediaKind, document_id: &str) -> PathBuf {
        self.root.join(kind.dir_name()).join(document_id)
    }

    /// Resolve a stored key to a path inside the root
    ///
    /// Absolute keys and keys that climb out of the root resolve to nothing.
    pub fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if key.is_empty() || !contained {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Read a stored file, `None` when it does not exist
    pub async fn read(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(path) = self.resolve(key) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove every rendition of a document, best-effort
    pub async fn remove_document(&self, document_id: &str) {
        for kind in [MediaKind::Image, MediaKind::Thumbnail] {
            let dir = self.document_dir(kind, document_id);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => tracing::debug!(document_id, dir = %dir.display(), "Removed media directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    document_id,
                    dir = %dir.display(),
                    "Failed to remove media directory: {}",
                    e
                ),
            }
        }
    }

    /// Reserve a fresh spool file for an incoming upload
    pub async fn create_temp_upload(&self) -> io::Result<(TempUpload, tokio::fs::File)> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let path = self.upload_dir.join(format!("{}.upload", Uuid::new_v4()));
        let file = tokio::fs::File::create(&path).await?;
        Ok((TempUpload::new(path), file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_page_keys() {
        let store = MediaStore::new("/srv/public", "/srv/uploads");
        assert_eq!(
            store.page_key(MediaKind::Image, "doc-1", 3),
            "images/doc-1/page-3.png"
        );
        assert_eq!(
            store.page_path(MediaKind::Thumbnail, "doc-1", 3),
            PathBuf::from("/srv/public/thumbnails/doc-1/page-3.png")
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let store = MediaStore::new("/srv/public", "/srv/uploads");
        assert!(store.resolve("images/doc/page-1.png").is_some());
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("images/../../secret").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path(), dir.path().join("uploads"));
        store.ensure_dirs().await.unwrap();

        assert!(store.read("images/doc/page-1.png").await.unwrap().is_none());

        let path = store.page_path(MediaKind::Image, "doc", 1);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"png").await.unwrap();
        assert_eq!(
            store.read("images/doc/page-1.png").await.unwrap(),
            Some(b"png".to_vec())
        );
    }

    #[tokio::test]
    async fn test_remove_document() {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path(), dir.path().join("uploads"));
        let path = store.page_path(MediaKind::Thumbnail, "doc", 1);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"png").await.unwrap();

        store.remove_document("doc").await;
        assert!(!store.document_dir(MediaKind::Thumbnail, "doc").exists());

        // Removing again is harmless
        store.remove_document("doc").await;
    }
}
