//! Route modules for the Flipbook server

pub mod auth;
pub mod documents;
pub mod health;
pub mod images;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum_test::TestServer;
    use tempfile::TempDir;

    use crate::auth::{hash_password, InMemorySessionStore, SessionStore};
    use crate::config::Config;
    use crate::db::{test_support::pool_in, UserRepository};
    use crate::pdf::FakeBackend;
    use crate::state::AppState;

    pub const TEST_EMAIL: &str = "ada@example.com";
    pub const TEST_PASSWORD: &str = "analytical-engine";

    pub const THREE_PAGES: &[u8] =
        b"%PDF-1.4\n2 0 obj << /Type /Pages /Kids [3 0 R 4 0 R 5 0 R] /Count 3 >> endobj\n%%EOF";

    pub struct TestApp {
        pub server: TestServer,
        pub state: AppState,
        _dir: TempDir,
    }

    pub async fn test_app() -> TestApp {
        test_app_with(FakeBackend::Pages(3)).await
    }

    pub async fn test_app_with(backend: FakeBackend) -> TestApp {
        test_app_configured(backend, |_| {}).await
    }

    /// Test app whose config is adjusted before the state is built
    pub async fn test_app_configured(backend: FakeBackend, configure: impl FnOnce(&mut Config)) -> TestApp {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.media.root = dir.path().join("public");
        config.media.upload_dir = dir.path().join("uploads");
        configure(&mut config);

        let db = pool_in(&dir).await;
        let sessions = Arc::new(InMemorySessionStore::default());
        sessions.init().await.unwrap();

        let state = AppState::new(&config, db, sessions, Arc::new(backend));
        state.media().ensure_dirs().await.unwrap();

        let server = TestServer::new(crate::app(state.clone())).unwrap();
        TestApp {
            server,
            state,
            _dir: dir,
        }
    }

    /// Create the test user if needed and open a session for it
    pub async fn login(app: &TestApp) -> String {
        let users = UserRepository::new(app.state.db());
        let user = match users.get_by_email(TEST_EMAIL).await.unwrap() {
            Some(user) => user,
            None => users
                .create("ada", TEST_EMAIL, &hash_password(TEST_PASSWORD).unwrap())
                .await
                .unwrap(),
        };

        app.state
            .sessions()
            .create(&user.id, &user.username)
            .await
            .unwrap()
            .token
    }
}
