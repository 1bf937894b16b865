//! Request stages shared by every proxied route.
//!
//! `authenticate` -> `acquire_token` -> backend check -> `read_body` -> forward.
//! Each stage either yields its output or the `ApiError` the browser will see.

use axum::{
    body::{Bytes, to_bytes},
    extract::Request,
    http::{HeaderMap, Method, StatusCode},
};

use super::routes::carries_body;
use crate::auth::{AccessToken, Session, SessionProvider};
use crate::error::ApiError;

/// Access guard: a signed-in principal or 401
pub async fn authenticate(sessions: &dyn SessionProvider, headers: &HeaderMap) -> Result<Session, ApiError> {
    sessions
        .get_session(headers)
        .await
        .filter(Session::is_authenticated)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
}

/// Bearer token for this request only. An empty token is a failure, never a
/// request without credentials.
pub async fn acquire_token(sessions: &dyn SessionProvider, session: &Session) -> Result<AccessToken, ApiError> {
    let token = sessions.get_access_token(session).await?;
    if token.is_empty() {
        return Err(ApiError::TokenAcquisition {
            status: StatusCode::BAD_GATEWAY,
            message: "Identity provider returned an empty access token".to_string(),
        });
    }
    Ok(token)
}

/// Inbound body for methods that carry one. Empty bodies are not forwarded.
pub async fn read_body(request: Request, limit: usize, method: &Method) -> Result<Option<Bytes>, ApiError> {
    if !carries_body(method) {
        return Ok(None);
    }
    let body = to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| ApiError::bad_gateway(format!("Failed to read request body: {}", e)))?;
    Ok((!body.is_empty()).then_some(body))
}
