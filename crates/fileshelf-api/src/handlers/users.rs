use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use fileshelf_core::models::{RegisterRequest, UserResponse};
use fileshelf_core::AppError;

use crate::auth::UserContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// `POST /users`
#[tracing::instrument(skip_all, fields(operation = "create_user"))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), HttpAppError> {
    let user = state.credentials.register(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `GET /users/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<Json<UserResponse>, HttpAppError> {
    let user = state
        .stores
        .users
        .find_by_id(ctx.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(user.into()))
}
