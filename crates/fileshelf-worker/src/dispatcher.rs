//! Routes claimed jobs to their handler and settles the delivery.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use fileshelf_core::models::JobKind;
use fileshelf_db::Stores;
use fileshelf_storage::Storage;

use crate::handler::JobHandler;
use crate::handlers::{ThumbnailHandler, WelcomeHandler};
use crate::queue::{Delivery, JobQueue, JobQueueConfig};

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acknowledged,
    Redelivering,
    Failed,
}

#[derive(Clone)]
pub struct Dispatcher {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
    config: JobQueueConfig,
}

impl Dispatcher {
    pub fn new(config: JobQueueConfig) -> Self {
        Self {
            handlers: HashMap::new(),
            config,
        }
    }

    /// A dispatcher with a handler for every job kind.
    pub fn for_stores(config: JobQueueConfig, stores: &Stores, storage: Arc<dyn Storage>) -> Self {
        Self::new(config)
            .with_handler(Arc::new(ThumbnailHandler::new(stores.tree(), storage)))
            .with_handler(Arc::new(WelcomeHandler::new(stores.users.clone())))
    }

    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    /// Kinds this dispatcher can process.
    pub fn kinds(&self) -> Vec<JobKind> {
        let mut kinds: Vec<JobKind> = self.handlers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Run the handler for `delivery` and settle it.
    ///
    /// Success acknowledges. An unrecoverable error, or a recoverable one on
    /// the last allowed attempt, acknowledges with the error recorded.
    /// Any other error releases the job for redelivery after a backoff.
    #[tracing::instrument(skip_all, fields(job.id = %delivery.job().id, job.kind = %delivery.job().kind))]
    pub async fn process(&self, delivery: Delivery) -> Result<Outcome> {
        let job = delivery.job().clone();

        let Some(handler) = self.handlers.get(&job.kind) else {
            let message = format!("No handler registered for job kind {}", job.kind);
            tracing::error!(error = %message, "Job cannot be processed");
            delivery.fail(&message).await?;
            return Ok(Outcome::Failed);
        };

        match handler.handle(&job).await {
            Ok(()) => {
                delivery.ack().await?;
                tracing::info!(attempts = job.attempts, "Job completed successfully");
                Ok(Outcome::Acknowledged)
            }
            Err(e) if !e.is_recoverable() => {
                tracing::error!(
                    error = %e,
                    attempts = job.attempts,
                    "Job failed with unrecoverable error, will not retry"
                );
                delivery.fail(&e.to_string()).await?;
                Ok(Outcome::Failed)
            }
            Err(e) if self.config.is_last_attempt(job.attempts) => {
                tracing::error!(
                    error = %e,
                    attempts = job.attempts + 1,
                    max_attempts = self.config.max_attempts,
                    "Job failed after max attempts"
                );
                delivery.fail(&e.to_string()).await?;
                Ok(Outcome::Failed)
            }
            Err(e) => {
                let backoff = self.config.retry_backoff(job.attempts);
                tracing::warn!(
                    error = %e,
                    attempts = job.attempts + 1,
                    backoff_seconds = backoff.as_secs(),
                    "Job failed, scheduling redelivery"
                );
                delivery.nack(&e.to_string(), backoff).await?;
                Ok(Outcome::Redelivering)
            }
        }
    }

    /// Process jobs one at a time until none is available right now.
    /// Returns how many deliveries were settled.
    pub async fn run_until_idle(&self, queue: &JobQueue) -> Result<usize> {
        let consumer = queue.consume(&self.kinds());
        let mut processed = 0;
        while let Some(delivery) = consumer.try_next().await? {
            self.process(delivery).await?;
            processed += 1;
        }
        Ok(processed)
    }
}
