//! Page database operations

use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::timestamp;
use crate::error::{AppError, Result};

/// Page record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub document_id: String,
    pub page_number: i64,
    pub image_path: String,
    pub thumbnail_path: String,
    pub created_at: String,
}

/// Create page request
#[derive(Debug, Clone)]
pub struct NewPage {
    pub page_number: i64,
    pub image_path: String,
    pub thumbnail_path: String,
}

/// Page repository
pub struct PageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a page by document and 1-based page number
    pub async fn get(&self, document_id: &str, page_number: i64) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>(
            r#"
            SELECT id, document_id, page_number, image_path, thumbnail_path, created_at
            FROM pages
            WHERE document_id = ? AND page_number = ?
            "#,
        )
        .bind(document_id)
        .bind(page_number)
        .fetch_optional(self.pool)
        .await?;

        Ok(page)
    }

    /// List pages for a document in page order
    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<Page>> {
        let pages = sqlx::query_as::<_, Page>(
            r#"
            SELECT id, document_id, page_number, image_path, thumbnail_path, created_at
            FROM pages
            WHERE document_id = ?
            ORDER BY page_number ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(pages)
    }

    /// Create a single page
    pub async fn create(&self, document_id: &str, data: &NewPage) -> Result<Page> {
        let mut tx = self.pool.begin().await?;
        let page = insert_page(&mut tx, document_id, data).await?;
        tx.commit().await?;
        Ok(page)
    }

    /// Create every page of a document in one transaction
    ///
    /// Either all pages are written or none are.
    pub async fn create_all(&self, document_id: &str, pages: &[NewPage]) -> Result<Vec<Page>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(pages.len());

        for data in pages {
            created.push(insert_page(&mut tx, document_id, data).await?);
        }

        tx.commit().await?;
        Ok(created)
    }
}

async fn insert_page(
    tx: &mut Transaction<'_, Sqlite>,
    document_id: &str,
    data: &NewPage,
) -> Result<Page> {
    if data.image_path.is_empty() || data.thumbnail_path.is_empty() {
        return Err(AppError::Internal(format!(
            "Invalid paths for page {}: image_path={:?}, thumbnail_path={:?}",
            data.page_number, data.image_path, data.thumbnail_path
        )));
    }

    let page = Page {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        page_number: data.page_number,
        image_path: data.image_path.clone(),
        thumbnail_path: data.thumbnail_path.clone(),
        created_at: timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO pages (id, document_id, page_number, image_path, thumbnail_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&page.id)
    .bind(&page.document_id)
    .bind(page.page_number)
    .bind(&page.image_path)
    .bind(&page.thumbnail_path)
    .bind(&page.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict(
            format!(
                "Page {} already exists for document {}",
                data.page_number, document_id
            ),
        ),
        other => AppError::Database(other),
    })?;

    Ok(page)
}
