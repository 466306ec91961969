//! Polling worker pool.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::dispatcher::Dispatcher;
use crate::queue::{JobConsumer, JobQueue};

/// Claims jobs and runs up to `concurrency` of them at once.
pub struct WorkerPool {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawn the pool on the current runtime.
    pub fn start(queue: JobQueue, dispatcher: Dispatcher) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(Self::run(queue, dispatcher, shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop claiming new jobs and wait for in-flight ones to settle.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Worker pool task panicked");
        }
    }

    async fn run(queue: JobQueue, dispatcher: Dispatcher, mut shutdown_rx: mpsc::Receiver<()>) {
        let config = queue.config().clone();
        let concurrency = config.concurrency.max(1);
        let kinds = dispatcher.kinds();
        tracing::info!(
            concurrency,
            poll_interval_ms = config.poll_interval_ms,
            lease_seconds = config.lease_seconds,
            kinds = ?kinds,
            "Worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let consumer = queue.consume(&kinds);
        let dispatcher = Arc::new(dispatcher);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Worker pool shutting down");
                    break;
                }
                _ = sleep(config.poll_interval()) => {
                    Self::claim_and_dispatch(&consumer, &semaphore, &dispatcher).await;
                }
            }
        }

        // Wait for in-flight jobs.
        if let Ok(permits) = semaphore.acquire_many(concurrency as u32).await {
            drop(permits);
        }
        tracing::info!("Worker pool stopped");
    }

    /// Claim as many jobs as there are free workers.
    async fn claim_and_dispatch(
        consumer: &JobConsumer,
        semaphore: &Arc<Semaphore>,
        dispatcher: &Arc<Dispatcher>,
    ) {
        loop {
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::debug!("No workers available, skipping claim");
                    return;
                }
            };

            match consumer.try_next().await {
                Ok(Some(delivery)) => {
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = dispatcher.process(delivery).await {
                            tracing::error!(error = %e, "Failed to settle job");
                        }
                    });
                }
                Ok(None) => {
                    tracing::trace!("No jobs available in queue");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to claim job from queue");
                    return;
                }
            }
        }
    }
}
