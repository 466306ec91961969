//! Credential verification and registration.

use std::sync::Arc;

use base64::Engine;
use fileshelf_core::models::{RegisterRequest, User};
use fileshelf_core::AppError;
use fileshelf_db::UserRepository;
use fileshelf_worker::JobQueue;
use uuid::Uuid;

use super::password::{hash_password, verify_password};

/// Decode a `Basic` credential blob into `(email, password)`.
///
/// Accepts either the full `Authorization` header value or the bare base64
/// part. Anything that does not decode to exactly two `:`-separated fields
/// is rejected.
pub fn parse_basic_credentials(blob: &str) -> Option<(String, String)> {
    let blob = blob.trim();
    let encoded = match blob.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("basic") => rest.trim(),
        Some(_) => return None,
        None => blob,
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let fields: Vec<&str> = decoded.split(':').collect();
    match fields.as_slice() {
        [email, password] => Some((email.to_string(), password.to_string())),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
    queue: JobQueue,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>, queue: JobQueue) -> Self {
        Self { users, queue }
    }

    /// Resolve a `Basic` credential blob to a user id.
    ///
    /// Malformed blobs, unknown emails and wrong passwords all fail with the
    /// same `Unauthorized`.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, blob: &str) -> Result<Uuid, AppError> {
        let (email, password) = parse_basic_credentials(blob).ok_or(AppError::Unauthorized)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&password, &user.password_hash) {
            return Err(AppError::Unauthorized);
        }

        Ok(user.id)
    }

    /// Create a user and enqueue its welcome job.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, request: RegisterRequest) -> Result<User, AppError> {
        let (email, password) = request.validate()?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let user = self.users.create(&email, &hash_password(&password)).await?;
        tracing::info!(user_id = %user.id, "User registered");

        if let Err(e) = self.queue.enqueue_welcome(user.id).await {
            tracing::error!(error = %e, user_id = %user.id, "Failed to enqueue welcome job");
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fileshelf_core::models::JobKind;
    use fileshelf_db::{MemoryJobStore, MemoryUserRepository};
    use fileshelf_worker::JobQueueConfig;

    fn basic(raw: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }

    fn verifier() -> (CredentialVerifier, Arc<MemoryJobStore>) {
        let jobs = Arc::new(MemoryJobStore::new());
        let queue = JobQueue::new(jobs.clone(), JobQueueConfig::default());
        (
            CredentialVerifier::new(Arc::new(MemoryUserRepository::new()), queue),
            jobs,
        )
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_parse_requires_two_fields() {
        assert_eq!(
            parse_basic_credentials(&basic("a@b.com:pw")),
            Some(("a@b.com".to_string(), "pw".to_string()))
        );
        assert_eq!(parse_basic_credentials(&basic("a@b.com")), None);
        assert_eq!(parse_basic_credentials(&basic("a@b.com:p:w")), None);
        assert_eq!(parse_basic_credentials("Basic !!!"), None);
        assert_eq!(parse_basic_credentials("Bearer abc"), None);
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let (verifier, jobs) = verifier();
        let user = verifier
            .register(register_request("a@b.com", "pw"))
            .await
            .unwrap();

        let id = verifier.authenticate(&basic("a@b.com:pw")).await.unwrap();
        assert_eq!(id, user.id);

        let records = jobs.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job.kind, JobKind::Welcome);
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let (verifier, _) = verifier();
        verifier
            .register(register_request("a@b.com", "pw"))
            .await
            .unwrap();

        let wrong_password = verifier.authenticate(&basic("a@b.com:nope")).await;
        let unknown_email = verifier.authenticate(&basic("x@b.com:pw")).await;
        assert!(matches!(wrong_password, Err(AppError::Unauthorized)));
        assert!(matches!(unknown_email, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let (verifier, _) = verifier();
        verifier
            .register(register_request("a@b.com", "pw"))
            .await
            .unwrap();
        let err = verifier
            .register(register_request("a@b.com", "other"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Already exist");
    }
}
