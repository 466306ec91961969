//! File content, open to anonymous callers for public nodes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use super::parse_id;
use crate::auth::MaybeUser;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ContentQuery {
    pub size: Option<String>,
}

/// `GET /files/{id}/data?size=`
#[tracing::instrument(skip_all, fields(operation = "get_content"))]
pub async fn get_content(
    State(state): State<Arc<AppState>>,
    viewer: MaybeUser,
    Path(id): Path<String>,
    Query(query): Query<ContentQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_id(&id)?;
    let node = state.access.readable_content(viewer.user_id(), id).await?;
    let content = state.files.content(&node, query.size.as_deref()).await?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.bytes))
}
