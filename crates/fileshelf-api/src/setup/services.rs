//! Store wiring and background tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use fileshelf_core::Config;
use fileshelf_db::{SessionStore, Stores};
use fileshelf_storage::Storage;
use fileshelf_worker::{Dispatcher, JobQueue, JobQueueConfig, WorkerPool};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::setup::routes::setup_routes;
use crate::state::AppState;

/// A fully wired application, ready to serve.
pub struct App {
    pub state: Arc<AppState>,
    pub router: Router,
    pub background: BackgroundTasks,
}

/// Work running next to the HTTP server.
#[derive(Default)]
pub struct BackgroundTasks {
    worker: Option<WorkerPool>,
    session_purge: Option<(mpsc::Sender<()>, JoinHandle<()>)>,
}

impl BackgroundTasks {
    pub async fn shutdown(self) {
        if let Some((tx, handle)) = self.session_purge {
            let _ = tx.send(()).await;
            let _ = handle.await;
        }
        if let Some(worker) = self.worker {
            worker.shutdown().await;
        }
    }
}

/// Build state from already constructed stores.
pub fn build_state(config: Config, stores: Stores, storage: Arc<dyn Storage>) -> Arc<AppState> {
    let queue = JobQueue::new(stores.jobs.clone(), JobQueueConfig::from(&config));
    Arc::new(AppState::new(config, stores, storage, queue))
}

/// Connect the stores, build the router and start background work.
pub async fn initialize_app(config: Config) -> Result<App> {
    let stores = fileshelf_db::connect_stores(&config)
        .await
        .context("Failed to connect to stores")?;
    let storage = fileshelf_storage::create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!(
        backend = storage.backend_name(),
        path = %config.folder_path.display(),
        "Storage initialized"
    );

    let state = build_state(config.clone(), stores.clone(), storage.clone());

    let mut background = BackgroundTasks::default();
    if config.worker_enabled {
        let queue_config = JobQueueConfig::from(&config);
        let dispatcher = Dispatcher::for_stores(queue_config, &stores, storage);
        background.worker = Some(WorkerPool::start(state.queue.clone(), dispatcher));
    } else {
        tracing::info!("In-process worker disabled");
    }
    if config.session_purge_interval_secs > 0 {
        background.session_purge = Some(spawn_session_purge(
            stores.sessions.clone(),
            Duration::from_secs(config.session_purge_interval_secs),
        ));
    }

    let router = setup_routes(state.clone());

    Ok(App {
        state,
        router,
        background,
    })
}

fn spawn_session_purge(
    sessions: Arc<dyn SessionStore>,
    every: Duration,
) -> (mpsc::Sender<()>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match sessions.purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::debug!(purged, "Expired sessions purged"),
                        Err(e) => tracing::error!(error = %e, "Session purge failed"),
                    }
                }
                _ = rx.recv() => break,
            }
        }
    });
    (tx, handle)
}
