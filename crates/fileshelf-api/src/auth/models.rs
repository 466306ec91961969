use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fileshelf_core::AppError;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

use super::middleware::token_from_headers;

/// Identity resolved from the `X-Token` header and stored in request extensions.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub token: String,
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(HttpAppError(AppError::Unauthorized))
    }
}

/// Identity of the caller when one is presented, for routes that also serve
/// anonymous requests. A missing or unknown token is simply no identity.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserContext>);

impl MaybeUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|ctx| ctx.user_id)
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<UserContext>() {
            return Ok(MaybeUser(Some(ctx.clone())));
        }
        let token = token_from_headers(&parts.headers);
        let ctx = state.access.identify_optional(token).await?;
        Ok(MaybeUser(ctx))
    }
}
