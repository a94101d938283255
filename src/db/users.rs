//! User database operations

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::timestamp;
use crate::error::{AppError, Result};

/// User record
///
/// The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Create a user from an already hashed password
    pub async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<User> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(timestamp())
        .execute(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::BadRequest("Username or email already exists".to_string())
            }
            other => AppError::Database(other),
        })?;

        self.get(&id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created user".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::pool_in;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = UserRepository::new(&pool);

        let user = repo.create("reader", "reader@example.com", "$argon2id$stub").await.unwrap();

        let by_email = repo.get_by_email("reader@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_name = repo.get_by_username("reader").await.unwrap().unwrap();
        assert_eq!(by_name.email, "reader@example.com");
        assert!(repo.get_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let dir = TempDir::new().unwrap();
        let pool = pool_in(&dir).await;
        let repo = UserRepository::new(&pool);

        repo.create("reader", "a@example.com", "h").await.unwrap();
        let result = repo.create("reader", "b@example.com", "h").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_hash_not_serialized() {
        let user = User {
            id: "1".into(),
            username: "reader".into(),
            email: "reader@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: "2024-01-01T00:00:00.000000Z".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("createdAt"));
    }
}
