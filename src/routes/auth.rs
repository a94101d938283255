//! Account and session routes
//!
//! - POST /api/user/login - Exchange credentials for a session token
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/logout - End a session
//! - GET /api/auth/session - Check (and extend) a session

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, session_token, verify_password, SessionError};
use crate::db::{User, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenParams {
    pub session_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

// ============================================================================
// Routers
// ============================================================================

/// Routes under /api/user
pub fn user_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Routes under /api/auth
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/session", get(check_session))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/user/login
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Json<LoginResponse>> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = UserRepository::new(state.db())
        .get_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash) {
        tracing::info!(user_id = %user.id, "Rejected login");
        return Err(invalid());
    }

    let session = state.sessions().create(&user.id, &user.username).await?;

    Ok(Json(LoginResponse {
        user,
        session_token: session.token,
    }))
}

/// POST /api/auth/register
async fn register(State(state): State<AppState>, Json(req): Json<RegisterRequest>) -> Result<Json<UserResponse>> {
    let username = req.username.trim();
    let email = req.email.trim();

    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username, email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    let users = UserRepository::new(state.db());
    if users.get_by_username(username).await?.is_some() {
        return Err(AppError::BadRequest("Username already taken".to_string()));
    }
    if users.get_by_email(email).await?.is_some() {
        return Err(AppError::BadRequest("Email already registered".to_string()));
    }

    // The unique indexes still catch a concurrent registration
    let password_hash = hash_password(&req.password)?;
    let user = users.create(username, email, &password_hash).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Registered user");
    Ok(Json(UserResponse { user }))
}

/// POST /api/auth/logout
///
/// The token comes from the `Authorization` header or a JSON body.
async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<TokenParams>>,
) -> Result<Json<LogoutResponse>> {
    let token = session_token(&headers)
        .or_else(|| body.and_then(|Json(params)| params.session_token))
        .ok_or_else(|| AppError::BadRequest("Missing session token".to_string()))?;

    let success = state.sessions().revoke(&token).await?;
    Ok(Json(LogoutResponse { success }))
}

/// GET /api/auth/session?sessionToken=
async fn check_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TokenParams>,
) -> Result<Json<SessionStatus>> {
    let Some(token) = params.session_token.or_else(|| session_token(&headers)) else {
        return Ok(Json(SessionStatus {
            valid: false,
            user: None,
        }));
    };

    let session = match state.sessions().touch(&token).await {
        Ok(session) => session,
        Err(SessionError::NotFound) => {
            return Ok(Json(SessionStatus {
                valid: false,
                user: None,
            }))
        }
        Err(e) => return Err(e.into()),
    };

    let user = UserRepository::new(state.db()).get(&session.user_id).await?;
    Ok(Json(SessionStatus {
        valid: user.is_some(),
        user,
    }))
}
