//! HTTP error response conversion
//!
//! This module provides HTTP-specific error response conversion for AppError.
//!
//! Error bodies carry `{error, code}`. The `details` field is added by
//! [`error_details_middleware`] only when the service is not running in
//! production, and never for sensitive errors.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use fileshelf_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse.
/// IntoResponse and AppError are both foreign to this crate.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

/// Detailed body of a non-sensitive error, kept in the response extensions.
#[derive(Debug, Clone)]
struct ErrorDetails(ErrorResponse);

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::new(app_error.client_message(), app_error.error_code());
        let detailed = (!app_error.is_sensitive()).then(|| ErrorResponse {
            details: Some(app_error.detailed_message()),
            ..body.clone()
        });

        let mut response = (status, Json(body)).into_response();
        if let Some(detailed) = detailed {
            response.extensions_mut().insert(ErrorDetails(detailed));
        }
        response
    }
}

/// Re-render error bodies with their `details` unless `is_production`.
pub async fn error_details_middleware(
    State(is_production): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(ErrorDetails(detailed)) = response.extensions_mut().remove::<ErrorDetails>() else {
        return response;
    };
    if is_production {
        return response;
    }
    (response.status(), Json(detailed)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshelf_core::ParentError;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::MissingField("name"), StatusCode::BAD_REQUEST),
            (ParentError::NotFolder.into(), StatusCode::BAD_REQUEST),
            (AppError::DuplicateEmail, StatusCode::BAD_REQUEST),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (AppError::FolderHasNoContent, StatusCode::BAD_REQUEST),
            (AppError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(HttpAppError(err).into_response().status(), status);
        }
    }

    async fn bad_page() -> Result<(), HttpAppError> {
        Err(AppError::InvalidInput("Invalid page".to_string()).into())
    }

    async fn broken_store() -> Result<(), HttpAppError> {
        Err(AppError::Storage("connection refused".to_string()).into())
    }

    fn server(is_production: bool) -> axum_test::TestServer {
        let app = axum::Router::new()
            .route("/bad", axum::routing::get(bad_page))
            .route("/broken", axum::routing::get(broken_store))
            .layer(axum::middleware::from_fn_with_state(
                is_production,
                error_details_middleware,
            ));
        axum_test::TestServer::new(app.into_make_service()).expect("Failed to create test server")
    }

    #[tokio::test]
    async fn test_details_shown_outside_production() {
        let response = server(false).get("/bad").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid page");
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn test_details_hidden_in_production() {
        let response = server(true).get("/bad").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid page");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_sensitive_errors_never_carry_details() {
        let response = server(false).get("/broken").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = response.json();
        assert!(body.get("details").is_none());
        assert!(!body.to_string().contains("connection refused"));
    }
}
