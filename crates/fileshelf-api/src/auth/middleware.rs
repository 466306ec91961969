use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use fileshelf_core::constants::TOKEN_HEADER;

use crate::error::HttpAppError;
use crate::state::AppState;

pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware to authenticate requests using the session token
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = token_from_headers(request.headers()).map(str::to_string);

    let ctx = match state.access.identify(token.as_deref()).await {
        Ok(ctx) => ctx,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::debug!(user_id = %ctx.user_id, "Session resolved");
    request.extensions_mut().insert(ctx);

    next.run(request).await
}
