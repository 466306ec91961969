//! Job queue: enqueue from request handlers, consume from workers.
//!
//! Delivery is at-least-once. A consumed job stays leased to its consumer
//! until the [`Delivery`] is acknowledged, released or failed; if none of
//! those happen before the lease lapses the job is delivered again.

use anyhow::{Context, Result};
use fileshelf_core::models::{Job, JobKind, ThumbnailPayload, WelcomePayload};
use fileshelf_core::Config;
use fileshelf_db::JobStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Maximum delay in seconds before redelivering a failed job.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct JobQueueConfig {
    /// Jobs processed concurrently by one worker pool.
    pub concurrency: usize,
    pub poll_interval_ms: u64,
    /// Visibility timeout of a claimed job.
    pub lease_seconds: u64,
    /// 0 = redeliver until acknowledged.
    pub max_attempts: u32,
    /// Cap on the exponential redelivery delay. 0 = redeliver immediately.
    pub max_backoff_secs: u64,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_interval_ms: 500,
            lease_seconds: 300,
            max_attempts: 0,
            max_backoff_secs: MAX_RETRY_BACKOFF_SECS,
        }
    }
}

impl From<&Config> for JobQueueConfig {
    fn from(config: &Config) -> Self {
        Self {
            concurrency: config.worker_concurrency,
            poll_interval_ms: config.worker_poll_interval_ms,
            lease_seconds: config.job_lease_seconds,
            max_attempts: config.job_max_attempts,
            max_backoff_secs: config.job_max_backoff_secs,
        }
    }
}

impl JobQueueConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before redelivering a job that has failed `attempts` times
    /// before this failure: `2^attempts` seconds, capped.
    pub fn retry_backoff(&self, attempts: i32) -> Duration {
        Duration::from_secs(compute_retry_backoff_seconds(attempts, self.max_backoff_secs))
    }

    /// Whether the failure being reported exhausts the attempt budget.
    pub fn is_last_attempt(&self, attempts: i32) -> bool {
        self.max_attempts > 0 && attempts.saturating_add(1) >= self.max_attempts as i32
    }
}

/// Computes backoff in seconds for a given attempt count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(attempts: i32, cap: u64) -> u64 {
    let exponent = attempts.clamp(0, 63) as u32;
    2_u64.saturating_pow(exponent).min(cap)
}

#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    config: JobQueueConfig,
}

impl JobQueue {
    pub fn new(store: Arc<dyn JobStore>, config: JobQueueConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &JobQueueConfig {
        &self.config
    }

    pub async fn is_alive(&self) -> bool {
        self.store.is_alive().await
    }

    /// Append a job. Same-kind jobs are not deduplicated.
    #[tracing::instrument(skip(self, payload), fields(job.kind = %kind))]
    pub async fn enqueue<P: Serialize>(&self, kind: JobKind, payload: &P) -> Result<Uuid> {
        let payload = serde_json::to_value(payload).context("Failed to serialize job payload")?;
        let id = self.store.enqueue(kind, payload).await?;

        tracing::info!(job.id = %id, job.kind = %kind, "Job submitted to queue");
        Ok(id)
    }

    pub async fn enqueue_thumbnail(&self, file_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        self.enqueue(JobKind::Thumbnail, &ThumbnailPayload::new(file_id, user_id))
            .await
    }

    pub async fn enqueue_welcome(&self, user_id: Uuid) -> Result<Uuid> {
        self.enqueue(JobKind::Welcome, &WelcomePayload::new(user_id))
            .await
    }

    /// Start consuming jobs of the given kinds.
    pub fn consume(&self, kinds: &[JobKind]) -> JobConsumer {
        JobConsumer {
            store: self.store.clone(),
            kinds: kinds.to_vec(),
            lease: self.config.lease(),
            poll_interval: self.config.poll_interval(),
        }
    }
}

/// Pulls jobs one at a time.
pub struct JobConsumer {
    store: Arc<dyn JobStore>,
    kinds: Vec<JobKind>,
    lease: Duration,
    poll_interval: Duration,
}

impl JobConsumer {
    /// Claim the next available job, if any.
    pub async fn try_next(&self) -> Result<Option<Delivery>> {
        let claimed = self.store.claim(&self.kinds, self.lease).await?;
        Ok(claimed.map(|claimed| Delivery {
            job: claimed.job,
            lease: claimed.lease,
            store: self.store.clone(),
        }))
    }

    /// Wait until a job is available and claim it.
    pub async fn next(&self) -> Result<Delivery> {
        loop {
            if let Some(delivery) = self.try_next().await? {
                return Ok(delivery);
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// A claimed job. Settle it exactly once with [`Delivery::ack`],
/// [`Delivery::nack`] or [`Delivery::fail`]; dropping it unsettled leaves
/// the job to be redelivered when its lease lapses.
///
/// Once the lease has lapsed and another consumer has claimed the job,
/// settling is a no-op; the job belongs to the new claim.
pub struct Delivery {
    job: Job,
    lease: Uuid,
    store: Arc<dyn JobStore>,
}

impl Delivery {
    pub fn job(&self) -> &Job {
        &self.job
    }

    pub async fn ack(self) -> Result<()> {
        let settled = self.store.ack(self.job.id, self.lease).await?;
        self.log_if_stale(settled, "ack");
        Ok(())
    }

    pub async fn nack(self, error: &str, retry_after: Duration) -> Result<()> {
        let settled = self
            .store
            .nack(self.job.id, self.lease, error, retry_after)
            .await?;
        self.log_if_stale(settled, "nack");
        Ok(())
    }

    pub async fn fail(self, error: &str) -> Result<()> {
        let settled = self.store.fail(self.job.id, self.lease, error).await?;
        self.log_if_stale(settled, "fail");
        Ok(())
    }

    fn log_if_stale(&self, settled: bool, operation: &str) {
        if !settled {
            tracing::warn!(
                job.id = %self.job.id,
                job.kind = %self.job.kind,
                operation,
                "Lease lost before settling; job left to its current claim"
            );
        }
    }
}
