use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Registered account. `password_hash` is never serialized.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user: `{id, email}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
        }
    }
}

/// Body of `POST /users`. Fields are optional so absence can be reported
/// as `Missing email` / `Missing password` rather than a parse failure.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl RegisterRequest {
    /// Returns `(email, password)` once both are present and non-empty.
    pub fn validate(self) -> Result<(String, String), AppError> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingField("email"))?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or(AppError::MissingField("password"))?;
        Ok((email, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_reports_first_missing_field() {
        let err = RegisterRequest::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "Missing email");

        let err = RegisterRequest {
            email: Some("a@b.com".into()),
            password: Some(String::new()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing password");
    }
}
