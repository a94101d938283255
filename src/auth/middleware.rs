//! Session authentication middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Session token from the `Authorization` header
///
/// Accepts `Bearer <token>` as well as a bare token.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();

    let token = match (parts.next()?, parts.next(), parts.next()) {
        (scheme, Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => token,
        (token, None, None) if !token.eq_ignore_ascii_case("bearer") => token,
        _ => return None,
    };
    Some(token.to_string())
}

/// Require a live session and extend it
///
/// The session is placed in the request extensions for handlers.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing session token".to_string()))?;

    let session = state.sessions().touch(&token).await.map_err(|e| {
        tracing::debug!("Rejected session: {}", e);
        AppError::from(e)
    })?;

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
