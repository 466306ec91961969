use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub db: bool,
    pub sessions: bool,
    pub queue: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub files: i64,
}

/// `GET /status`: liveness of each backing store. Always 200.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (users, files, sessions, queue) = tokio::join!(
        state.stores.users.is_alive(),
        state.stores.files.is_alive(),
        state.stores.sessions.is_alive(),
        state.queue.is_alive(),
    );
    Json(StatusResponse {
        db: users && files,
        sessions,
        queue,
    })
}

/// `GET /stats`
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, HttpAppError> {
    let users = state.stores.users.count().await?;
    let files = state.stores.files.count().await?;
    Ok(Json(StatsResponse { users, files }))
}
