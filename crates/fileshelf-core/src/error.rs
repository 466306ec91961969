//! Error types module
//!
//! All request-path failures are unified under [`AppError`]. Each variant
//! describes its own HTTP presentation through [`ErrorMetadata`], so the API
//! layer renders them without matching on variants.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Why a requested parent folder was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentError {
    NotFound,
    NotFolder,
}

impl std::fmt::Display for ParentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParentError::NotFound => f.write_str("Parent not found"),
            ParentError::NotFolder => f.write_str("Parent is not a folder"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("{0}")]
    InvalidParent(ParentError),

    #[error("Not found")]
    NotFound,

    #[error("Already exist")]
    DuplicateEmail,

    #[error("A folder doesn't have content")]
    FolderHasNoContent,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Processing failure: {0}")]
    ProcessingFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<ParentError> for AppError {
    fn from(err: ParentError) -> Self {
        AppError::InvalidParent(err)
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::Unauthorized => (401, "UNAUTHORIZED", false, false, LogLevel::Debug),
        AppError::MissingField(_) => (400, "MISSING_FIELD", false, false, LogLevel::Debug),
        AppError::InvalidParent(_) => (400, "INVALID_PARENT", false, false, LogLevel::Debug),
        AppError::NotFound => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::DuplicateEmail => (400, "DUPLICATE_EMAIL", false, false, LogLevel::Debug),
        AppError::FolderHasNoContent => (400, "FOLDER_HAS_NO_CONTENT", false, false, LogLevel::Debug),
        AppError::InvalidInput(_) => (400, "INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::ProcessingFailure(_) => (500, "PROCESSING_FAILURE", true, true, LogLevel::Warn),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Unauthorized => "Unauthorized",
            AppError::MissingField(_) => "MissingField",
            AppError::InvalidParent(_) => "InvalidParent",
            AppError::NotFound => "NotFound",
            AppError::DuplicateEmail => "DuplicateEmail",
            AppError::FolderHasNoContent => "FolderHasNoContent",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::ProcessingFailure(_) => "ProcessingFailure",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::ProcessingFailure(_) => "Failed to process file".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_match_wire_contract() {
        assert_eq!(AppError::MissingField("name").client_message(), "Missing name");
        assert_eq!(AppError::MissingField("email").client_message(), "Missing email");
        assert_eq!(AppError::DuplicateEmail.client_message(), "Already exist");
        assert_eq!(
            AppError::InvalidParent(ParentError::NotFound).client_message(),
            "Parent not found"
        );
        assert_eq!(
            AppError::InvalidParent(ParentError::NotFolder).client_message(),
            "Parent is not a folder"
        );
        assert_eq!(AppError::NotFound.client_message(), "Not found");
        assert_eq!(AppError::Unauthorized.client_message(), "Unauthorized");
        assert_eq!(
            AppError::FolderHasNoContent.client_message(),
            "A folder doesn't have content"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthorized.http_status_code(), 401);
        assert_eq!(AppError::NotFound.http_status_code(), 404);
        assert_eq!(AppError::MissingField("type").http_status_code(), 400);
        assert_eq!(AppError::DuplicateEmail.http_status_code(), 400);
        assert_eq!(AppError::FolderHasNoContent.http_status_code(), 400);
        assert_eq!(AppError::Storage("disk".into()).http_status_code(), 500);
    }

    #[test]
    fn test_store_errors_do_not_leak_details() {
        let err = AppError::Storage("/var/data/abc: permission denied".into());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");

        let err: AppError = anyhow::anyhow!("connection refused").into();
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");
        assert!(err.detailed_message().contains("connection refused"));
    }
}
