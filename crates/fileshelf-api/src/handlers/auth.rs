//! Login and logout.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use fileshelf_core::AppError;
use serde::Serialize;

use crate::auth::UserContext;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `GET /connect`: trade `Authorization: Basic` credentials for a session token.
#[tracing::instrument(skip_all, fields(operation = "connect"))]
pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, HttpAppError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let user_id = state.credentials.authenticate(authorization).await?;
    let token = state.stores.sessions.create_session(user_id).await?;

    tracing::info!(user_id = %user_id, "Session created");
    Ok(Json(TokenResponse { token }))
}

/// `GET /disconnect`: end the caller's session.
#[tracing::instrument(skip_all, fields(operation = "disconnect"))]
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<StatusCode, HttpAppError> {
    if !state.stores.sessions.destroy(&ctx.token).await? {
        // Expired between resolution and now.
        return Err(AppError::Unauthorized.into());
    }
    tracing::info!(user_id = %ctx.user_id, "Session destroyed");
    Ok(StatusCode::NO_CONTENT)
}
