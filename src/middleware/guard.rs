use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::proxy::pipeline;
use crate::state::AppState;

/// Access guard for proxied API routes.
///
/// Resolves the session once and hands it to the handler as an extension.
/// Without a signed-in principal the handler never runs and the browser gets
/// 401 `{"message":"Unauthorized"}`.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = pipeline::authenticate(state.sessions.as_ref(), request.headers()).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
