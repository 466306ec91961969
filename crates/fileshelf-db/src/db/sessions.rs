//! Session store: opaque tokens mapped to user ids with a fixed TTL.
//!
//! A stored, unexpired token is the only proof of a session. Resolution
//! never extends the TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use fileshelf_core::AppError;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Issue a new random token for `user_id`.
    async fn create_session(&self, user_id: Uuid) -> Result<String, AppError>;

    /// User id for a live token. Expired and unknown tokens are `None`.
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, AppError>;

    /// Remove a token. Returns whether a live session existed.
    async fn destroy(&self, token: &str) -> Result<bool, AppError>;

    /// Drop expired entries. Only reclaims space.
    async fn purge_expired(&self) -> Result<u64, AppError>;

    async fn is_alive(&self) -> bool;
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "insert"))]
    async fn create_session(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = new_token();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("Invalid session TTL: {}", e)))?;

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(user_id)
            .bind(Utc::now() + ttl)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    #[tracing::instrument(skip_all, fields(db.table = "sessions", db.operation = "select"))]
    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let user_id = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT user_id FROM sessions WHERE token = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id)
    }

    #[tracing::instrument(skip_all, fields(db.table = "sessions", db.operation = "delete"))]
    async fn destroy(&self, token: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1 AND expires_at > NOW()")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn is_alive(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// In-memory session store; expired entries are invisible and dropped lazily.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, (Uuid, Instant)>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = new_token();
        let expires_at = Instant::now() + self.ttl;
        self.sessions
            .lock()
            .await
            .insert(token.clone(), (user_id, expires_at));
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some((user_id, expires_at)) if *expires_at > Instant::now() => Ok(Some(*user_id)),
            Some(_) => {
                sessions.remove(token);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn destroy(&self, token: &str) -> Result<bool, AppError> {
        let removed = self.sessions.lock().await.remove(token);
        Ok(matches!(removed, Some((_, expires_at)) if expires_at > Instant::now()))
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        let now = Instant::now();
        sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - sessions.len()) as u64)
    }

    async fn is_alive(&self) -> bool {
        true
    }
}
