//! Document database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::timestamp;
use crate::error::{AppError, Result};

/// Document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub filename: String,
    pub page_count: i64,
    pub created_at: String,
}

/// Create document request
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub filename: String,
    pub page_count: i64,
}

/// Document repository
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a specific document
    pub async fn get(&self, id: &str) -> Result<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, title, filename, page_count, created_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    /// List all documents, newest first
    pub async fn list(&self) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, title, filename, page_count, created_at
            FROM documents
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(documents)
    }

    /// Create a new document
    pub async fn create(&self, data: &NewDocument) -> Result<Document> {
        if data.title.trim().is_empty() {
            return Err(AppError::Internal("Document title must not be empty".to_string()));
        }
        if data.page_count < 1 {
            return Err(AppError::Internal(format!(
                "Document page count must be positive, got {}",
                data.page_count
            )));
        }

        let id = Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, filename, page_count, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&data.title)
        .bind(&data.filename)
        .bind(data.page_count)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created document".to_string()))
    }

    /// Delete a document and, through the cascade, its pages
    ///
    /// Only used to roll back an ingestion that failed after the document row
    /// was written.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::pool_in;
    use tempfile::TempDir;

    fn new_doc(title: &str, page_count: i64) -> NewDocument {
        NewDocument {
            title: title.to_string(),
            filename: format!("{}.pdf", title.to_lowercase()),
            page_count,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = DocumentRepository::new(&pool);

        let created = repo.create(&new_doc("Report", 3)).await.unwrap();
        assert_eq!(created.title, "Report");
        assert_eq!(created.filename, "report.pdf");
        assert_eq!(created.page_count, 3);

        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = DocumentRepository::new(&pool);

        assert!(repo.get("does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = DocumentRepository::new(&pool);

        let first = repo.create(&new_doc("First", 1)).await.unwrap();
        let second = repo.create(&new_doc("Second", 2)).await.unwrap();
        let third = repo.create(&new_doc("Third", 3)).await.unwrap();

        let ids: Vec<String> = repo.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_page_count() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = DocumentRepository::new(&pool);

        assert!(repo.create(&new_doc("Empty", 0)).await.is_err());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = DocumentRepository::new(&pool);

        let doc = repo.create(&new_doc("Gone", 1)).await.unwrap();
        assert!(repo.delete(&doc.id).await.unwrap());
        assert!(!repo.delete(&doc.id).await.unwrap());
        assert!(repo.get(&doc.id).await.unwrap().is_none());
    }
}
