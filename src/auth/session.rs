//! Session registry
//!
//! Maps an opaque token to a logged-in user. Expiry slides: every successful
//! `touch` pushes it out by the TTL from "now". There is no sweeper; an
//! expired session is dropped by the access that finds it and is unknown from
//! then on, including to that access.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// Default session lifetime: 24 hours
pub const SESSION_TTL_HOURS: i64 = 24;

// ============================================================================
// Clock
// ============================================================================

/// Source of "now", injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ============================================================================
// Types
// ============================================================================

/// A logged-in user's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session registry is not open")]
    Closed,
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound => AppError::Unauthorized("Invalid session".to_string()),
            SessionError::Closed => AppError::Internal(e.to_string()),
        }
    }
}

/// Session storage backend
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open the registry; calls before this report `Closed`
    async fn init(&self) -> Result<(), SessionError>;

    /// Start a session for a user
    async fn create(&self, user_id: &str, username: &str) -> Result<Session, SessionError>;

    /// Look a session up without extending it
    async fn validate(&self, token: &str) -> Result<Session, SessionError>;

    /// Look a session up and extend its expiry
    async fn touch(&self, token: &str) -> Result<Session, SessionError>;

    /// End a session. Returns whether it existed.
    async fn revoke(&self, token: &str) -> Result<bool, SessionError>;

    /// Drop every session and refuse further calls
    async fn close(&self);
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local sessions, lost on restart
pub struct InMemorySessionStore {
    /// `None` while the registry is closed
    sessions: Mutex<Option<HashMap<String, Session>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(None),
            clock,
            ttl,
        }
    }

    pub fn with_ttl_hours(hours: i64) -> Self {
        Self::new(Arc::new(SystemClock), Duration::hours(hours))
    }

    /// Fetch a live session, removing it if it has expired
    fn live(&self, token: &str, extend: bool) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let mut guard = self.sessions.lock();
        let sessions = guard.as_mut().ok_or(SessionError::Closed)?;

        let session = sessions.get_mut(token).ok_or(SessionError::NotFound)?;
        if session.expires_at <= now {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            sessions.remove(token);
            return Err(SessionError::NotFound);
        }

        if extend {
            session.expires_at = now + self.ttl;
        }
        Ok(session.clone())
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl_hours(SESSION_TTL_HOURS)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn init(&self) -> Result<(), SessionError> {
        let mut guard = self.sessions.lock();
        if guard.is_none() {
            *guard = Some(HashMap::new());
            tracing::info!(ttl_hours = self.ttl.num_hours(), "Session registry opened");
        }
        Ok(())
    }

    async fn create(&self, user_id: &str, username: &str) -> Result<Session, SessionError> {
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            expires_at: self.clock.now() + self.ttl,
        };

        let mut guard = self.sessions.lock();
        let sessions = guard.as_mut().ok_or(SessionError::Closed)?;
        sessions.insert(session.token.clone(), session.clone());

        tracing::info!(user_id, username, "Created session");
        Ok(session)
    }

    async fn validate(&self, token: &str) -> Result<Session, SessionError> {
        self.live(token, false)
    }

    async fn touch(&self, token: &str) -> Result<Session, SessionError> {
        self.live(token, true)
    }

    async fn revoke(&self, token: &str) -> Result<bool, SessionError> {
        let mut guard = self.sessions.lock();
        let sessions = guard.as_mut().ok_or(SessionError::Closed)?;
        let removed = sessions.remove(token);

        if let Some(session) = &removed {
            tracing::info!(user_id = %session.user_id, "Revoked session");
        }
        Ok(removed.is_some())
    }

    async fn close(&self) {
        if let Some(sessions) = self.sessions.lock().take() {
            tracing::info!(dropped = sessions.len(), "Session registry closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_store() -> (InMemorySessionStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = InMemorySessionStore::new(clock.clone(), Duration::hours(SESSION_TTL_HOURS));
        store.init().await.unwrap();
        (store, clock)
    }

    #[tokio::test]
    async fn test_valid_after_create() {
        let (store, _) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        let found = store.validate(&session.token).await.unwrap();
        assert_eq!(found, session);
        assert_eq!(found.username, "ada");
    }

    #[tokio::test]
    async fn test_expires_without_access() {
        let (store, clock) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        clock.advance(Duration::hours(24));

        assert_eq!(store.validate(&session.token).await, Err(SessionError::NotFound));
        // Deleted on discovery
        assert!(store.sessions.lock().as_ref().unwrap().is_empty());
        assert_eq!(store.validate(&session.token).await, Err(SessionError::NotFound));
        assert_eq!(store.touch(&session.token).await, Err(SessionError::NotFound));
        assert!(!store.revoke(&session.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_keeps_session_alive() {
        let (store, clock) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        for _ in 0..10 {
            clock.advance(Duration::hours(23));
            store.touch(&session.token).await.unwrap();
        }

        // Well past the original expiry
        assert!(store.validate(&session.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_does_not_extend() {
        let (store, clock) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        clock.advance(Duration::hours(20));
        store.validate(&session.token).await.unwrap();
        clock.advance(Duration::hours(5));

        assert_eq!(store.validate(&session.token).await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_touch_extends_from_now() {
        let (store, clock) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        clock.advance(Duration::hours(10));
        let touched = store.touch(&session.token).await.unwrap();

        assert_eq!(touched.expires_at, clock.now() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_revoke() {
        let (store, _) = open_store().await;
        let session = store.create("user-1", "ada").await.unwrap();

        assert!(store.revoke(&session.token).await.unwrap());
        assert!(!store.revoke(&session.token).await.unwrap());
        assert_eq!(store.validate(&session.token).await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (store, _) = open_store().await;
        assert_eq!(store.validate("nope").await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let store = InMemorySessionStore::default();
        assert_eq!(store.create("u", "n").await.unwrap_err(), SessionError::Closed);

        store.init().await.unwrap();
        let session = store.create("u", "n").await.unwrap();

        store.close().await;
        assert_eq!(store.validate(&session.token).await, Err(SessionError::Closed));

        // Reopening starts empty
        store.init().await.unwrap();
        assert_eq!(store.validate(&session.token).await, Err(SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let (store, _) = open_store().await;
        let a = store.create("u", "n").await.unwrap();
        let b = store.create("u", "n").await.unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(AppError::from(SessionError::NotFound), AppError::Unauthorized(_)));
        assert!(matches!(AppError::from(SessionError::Closed), AppError::Internal(_)));
    }
}
