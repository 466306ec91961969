//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::middleware::session_middleware;
use crate::error::error_details_middleware;
use crate::handlers;
use crate::state::AppState;

/// Upper bound on a request body; uploads carry base64 content inline.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router {
    // No session required. Content access is decided per node.
    let public_routes = Router::new()
        .route("/status", get(handlers::status::status))
        .route("/stats", get(handlers::status::stats))
        .route("/users", post(handlers::users::create_user))
        .route("/connect", get(handlers::auth::connect))
        .route("/files/{id}/data", get(handlers::content::get_content));

    let protected_routes = Router::new()
        .route("/disconnect", get(handlers::auth::disconnect))
        .route("/users/me", get(handlers::users::me))
        .route(
            "/files",
            post(handlers::files::upload).get(handlers::files::index),
        )
        .route("/files/{id}", get(handlers::files::show))
        .route("/files/{id}/publish", put(handlers::files::publish))
        .route("/files/{id}/unpublish", put(handlers::files::unpublish))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    public_routes
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::middleware::from_fn_with_state(
                    state.is_production,
                    error_details_middleware,
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
