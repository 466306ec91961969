//! Durable job store with lease-based, at-least-once delivery.
//!
//! A claimed job is leased to one worker until `locked_until`. If the
//! worker neither acknowledges nor releases it before the lease lapses
//! (crash, hang), the job becomes claimable again.
//!
//! Every claim issues a fresh lease token. Settling a job (`ack`, `nack`,
//! `fail`) only applies while that token still holds the lease; a worker
//! whose lease lapsed and was reclaimed cannot touch the job any more.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fileshelf_core::models::{Job, JobKind, JobStatus};
use sqlx::{FromRow, PgPool, Postgres};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A job together with its delivery state.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job: Job,
    pub status: JobStatus,
    pub last_error: Option<String>,
}

/// A job leased to one consumer.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: Job,
    /// Token identifying this claim; required to settle the job.
    pub lease: Uuid,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Append a pending job and return its id.
    async fn enqueue(&self, kind: JobKind, payload: serde_json::Value) -> Result<Uuid>;

    /// Claim the next available job of one of `kinds`, leased for `lease`.
    async fn claim(&self, kinds: &[JobKind], lease: Duration) -> Result<Option<ClaimedJob>>;

    /// Processing succeeded; the job is never delivered again.
    ///
    /// This and the other settle operations return `false` without changing
    /// anything when `lease` no longer holds the job.
    async fn ack(&self, id: Uuid, lease: Uuid) -> Result<bool>;

    /// Processing failed; the job is redelivered once `retry_after` has passed.
    async fn nack(&self, id: Uuid, lease: Uuid, error: &str, retry_after: Duration) -> Result<bool>;

    /// Acknowledge with error; the job is never delivered again.
    async fn fail(&self, id: Uuid, lease: Uuid, error: &str) -> Result<bool>;

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>>;

    async fn is_alive(&self) -> bool;
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    kind: String,
    payload: serde_json::Value,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(JobRecord {
            job: Job {
                id: row.id,
                kind: row.kind.parse()?,
                payload: row.payload,
                attempts: row.attempts,
                created_at: row.created_at,
            },
            status: row.status.parse()?,
            last_error: row.last_error,
        })
    }
}

const JOB_COLUMNS: &str = "id, kind, payload, status, attempts, last_error, created_at";

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[tracing::instrument(skip(self, payload), fields(db.table = "jobs", db.operation = "insert"))]
    async fn enqueue(&self, kind: JobKind, payload: serde_json::Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO jobs (id, kind, payload) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(kind.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await
            .context("Failed to insert job")?;

        tracing::debug!(job.id = %id, job.kind = %kind, "Job enqueued");
        Ok(id)
    }

    /// Uses FOR UPDATE SKIP LOCKED so competing workers never claim the same row.
    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "claim"))]
    async fn claim(&self, kinds: &[JobKind], lease: Duration) -> Result<Option<ClaimedJob>> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
        let token = Uuid::new_v4();

        let row = sqlx::query_as::<Postgres, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET status = 'running',
                attempts = attempts + CASE WHEN status = 'running' THEN 1 ELSE 0 END,
                locked_until = NOW() + make_interval(secs => $2),
                lease_id = $3,
                updated_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE kind = ANY($1)
                    AND ((status = 'pending' AND available_at <= NOW())
                        OR (status = 'running' AND locked_until < NOW()))
                ORDER BY available_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(kinds)
        .bind(lease.as_secs_f64())
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to claim next job")?;

        match row {
            Some(row) => {
                let record = JobRecord::try_from(row)?;
                tracing::debug!(
                    job.id = %record.job.id,
                    job.kind = %record.job.kind,
                    attempts = record.job.attempts,
                    "Job claimed"
                );
                Ok(Some(ClaimedJob {
                    job: record.job,
                    lease: token,
                }))
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "jobs", db.operation = "update"))]
    async fn ack(&self, id: Uuid, lease: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'completed', locked_until = NULL, lease_id = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'running' AND lease_id = $2
            "#,
        )
        .bind(id)
        .bind(lease)
        .execute(&self.pool)
        .await
        .context("Failed to acknowledge job")?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "jobs", db.operation = "update"))]
    async fn nack(&self, id: Uuid, lease: Uuid, error: &str, retry_after: Duration) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'pending',
                attempts = attempts + 1,
                last_error = $3,
                available_at = NOW() + make_interval(secs => $4),
                locked_until = NULL,
                lease_id = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'running' AND lease_id = $2
            "#,
        )
        .bind(id)
        .bind(lease)
        .bind(error)
        .bind(retry_after.as_secs_f64())
        .execute(&self.pool)
        .await
        .context("Failed to release job")?;
        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "jobs", db.operation = "update"))]
    async fn fail(&self, id: Uuid, lease: Uuid, error: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'failed',
                attempts = attempts + 1,
                last_error = $3,
                locked_until = NULL,
                lease_id = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'running' AND lease_id = $2
            "#,
        )
        .bind(id)
        .bind(lease)
        .bind(error)
        .execute(&self.pool)
        .await
        .context("Failed to mark job as failed")?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>> {
        let row = sqlx::query_as::<Postgres, JobRow>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch job")?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn is_alive(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[derive(Debug, Clone)]
struct MemoryJob {
    record: JobRecord,
    available_at: Instant,
    locked_until: Option<Instant>,
    lease: Option<Uuid>,
}

/// In-memory job store with the same lease semantics as [`PgJobStore`].
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<Mutex<Vec<MemoryJob>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job ever enqueued, oldest first.
    pub async fn records(&self) -> Vec<JobRecord> {
        self.jobs
            .lock()
            .await
            .iter()
            .map(|j| j.record.clone())
            .collect()
    }

    async fn settle<F>(&self, id: Uuid, lease: Uuid, f: F) -> Result<bool>
    where
        F: FnOnce(&mut MemoryJob) + Send,
    {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.record.job.id == id)
            .ok_or_else(|| anyhow::anyhow!("Job {} not found", id))?;
        if job.record.status != JobStatus::Running || job.lease != Some(lease) {
            return Ok(false);
        }
        f(job);
        job.locked_until = None;
        job.lease = None;
        Ok(true)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn enqueue(&self, kind: JobKind, payload: serde_json::Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.jobs.lock().await.push(MemoryJob {
            record: JobRecord {
                job: Job {
                    id,
                    kind,
                    payload,
                    attempts: 0,
                    created_at: Utc::now(),
                },
                status: JobStatus::Pending,
                last_error: None,
            },
            available_at: Instant::now(),
            locked_until: None,
            lease: None,
        });
        Ok(id)
    }

    async fn claim(&self, kinds: &[JobKind], lease: Duration) -> Result<Option<ClaimedJob>> {
        let now = Instant::now();
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|j| kinds.contains(&j.record.job.kind))
            .filter(|j| match j.record.status {
                JobStatus::Pending => j.available_at <= now,
                JobStatus::Running => j.locked_until.is_some_and(|until| until < now),
                _ => false,
            })
            .min_by_key(|j| j.available_at);

        Ok(next.map(|j| {
            if j.record.status == JobStatus::Running {
                j.record.job.attempts += 1;
            }
            j.record.status = JobStatus::Running;
            let token = Uuid::new_v4();
            j.locked_until = Some(now + lease);
            j.lease = Some(token);
            ClaimedJob {
                job: j.record.job.clone(),
                lease: token,
            }
        }))
    }

    async fn ack(&self, id: Uuid, lease: Uuid) -> Result<bool> {
        self.settle(id, lease, |j| {
            j.record.status = JobStatus::Completed;
        })
        .await
    }

    async fn nack(&self, id: Uuid, lease: Uuid, error: &str, retry_after: Duration) -> Result<bool> {
        let error = error.to_string();
        self.settle(id, lease, move |j| {
            j.record.status = JobStatus::Pending;
            j.record.job.attempts += 1;
            j.record.last_error = Some(error);
            j.available_at = Instant::now() + retry_after;
        })
        .await
    }

    async fn fail(&self, id: Uuid, lease: Uuid, error: &str) -> Result<bool> {
        let error = error.to_string();
        self.settle(id, lease, move |j| {
            j.record.status = JobStatus::Failed;
            j.record.job.attempts += 1;
            j.record.last_error = Some(error);
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobRecord>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .find(|j| j.record.job.id == id)
            .map(|j| j.record.clone()))
    }

    async fn is_alive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LEASE: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_claimed_job_is_not_delivered_twice() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Welcome, json!({"userId": "u"})).await.unwrap();

        let claimed = store.claim(&[JobKind::Welcome], LEASE).await.unwrap().unwrap();
        assert_eq!(claimed.job.id, id);
        assert!(store.claim(&[JobKind::Welcome], LEASE).await.unwrap().is_none());

        assert!(store.ack(id, claimed.lease).await.unwrap());
        assert!(store.claim(&[JobKind::Welcome], LEASE).await.unwrap().is_none());
        assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_claim_filters_by_kind() {
        let store = MemoryJobStore::new();
        store.enqueue(JobKind::Thumbnail, json!({})).await.unwrap();

        assert!(store.claim(&[JobKind::Welcome], LEASE).await.unwrap().is_none());
        assert!(store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_nack_redelivers_after_delay() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Thumbnail, json!({})).await.unwrap();
        let claimed = store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().unwrap();

        assert!(store
            .nack(id, claimed.lease, "disk full", Duration::from_millis(30))
            .await
            .unwrap());
        assert!(store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(60)).await;
        let claimed = store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().unwrap();
        assert_eq!(claimed.job.id, id);
        assert_eq!(claimed.job.attempts, 1);
    }

    #[tokio::test]
    async fn test_expired_lease_is_redelivered() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Thumbnail, json!({})).await.unwrap();
        store
            .claim(&[JobKind::Thumbnail], Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let claimed = store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().unwrap();
        assert_eq!(claimed.job.id, id);
    }

    #[tokio::test]
    async fn test_failed_job_is_never_redelivered() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Thumbnail, json!({})).await.unwrap();
        let claimed = store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().unwrap();

        assert!(store.fail(id, claimed.lease, "Missing fileId").await.unwrap());
        assert!(store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().is_none());

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.last_error.as_deref(), Some("Missing fileId"));
    }

    #[tokio::test]
    async fn test_lapsed_lease_cannot_settle_reclaimed_job() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Thumbnail, json!({})).await.unwrap();

        let stale = store
            .claim(&[JobKind::Thumbnail], Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let current = store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().unwrap();
        assert_eq!(current.job.id, id);

        assert!(!store
            .nack(id, stale.lease, "timed out", Duration::ZERO)
            .await
            .unwrap());
        assert!(!store.fail(id, stale.lease, "timed out").await.unwrap());
        assert!(!store.ack(id, stale.lease).await.unwrap());

        // Still leased to the second claimant.
        assert!(store.claim(&[JobKind::Thumbnail], LEASE).await.unwrap().is_none());
        assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Running);

        assert!(store.ack(id, current.lease).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_settled_job_cannot_be_settled_again() {
        let store = MemoryJobStore::new();
        let id = store.enqueue(JobKind::Welcome, json!({})).await.unwrap();
        let claimed = store.claim(&[JobKind::Welcome], LEASE).await.unwrap().unwrap();

        assert!(store.fail(id, claimed.lease, "User not found").await.unwrap());
        assert!(!store.ack(id, claimed.lease).await.unwrap());
        assert_eq!(store.get(id).await.unwrap().unwrap().status, JobStatus::Failed);
    }
}
