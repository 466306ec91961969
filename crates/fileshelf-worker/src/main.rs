use fileshelf_core::Config;
use fileshelf_infra::{init_tracing, shutdown_signal};
use fileshelf_worker::{Dispatcher, JobQueue, JobQueueConfig, WorkerPool};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    init_tracing(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let stores = fileshelf_db::connect_stores(&config).await?;
    let storage = fileshelf_storage::create_storage(&config).await?;

    let queue_config = JobQueueConfig::from(&config);
    let queue = JobQueue::new(stores.jobs.clone(), queue_config.clone());
    let dispatcher = Dispatcher::for_stores(queue_config, &stores, storage);

    tracing::info!(
        environment = %config.environment,
        folder_path = %config.folder_path.display(),
        "Starting standalone worker"
    );
    let pool = WorkerPool::start(queue, dispatcher);

    shutdown_signal().await;
    pool.shutdown().await;

    Ok(())
}
