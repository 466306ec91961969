//! Builds the configured store backends.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use fileshelf_core::{Config, StoreBackend};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::db::{
    FileRepository, JobStore, MemoryFileRepository, MemoryJobStore, MemorySessionStore,
    MemoryUserRepository, MetadataTree, PgFileRepository, PgJobStore, PgSessionStore,
    PgUserRepository, SessionStore, UserRepository,
};

/// Handles to every store, constructed once at startup and shared.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub jobs: Arc<dyn JobStore>,
}

impl Stores {
    pub fn in_memory(session_ttl: Duration) -> Self {
        Self {
            users: Arc::new(MemoryUserRepository::new()),
            files: Arc::new(MemoryFileRepository::new()),
            sessions: Arc::new(MemorySessionStore::new(session_ttl)),
            jobs: Arc::new(MemoryJobStore::new()),
        }
    }

    pub fn tree(&self) -> MetadataTree {
        MetadataTree::new(self.files.clone())
    }
}

/// Open a PostgreSQL pool and apply pending migrations.
pub async fn connect_pool(url: &str, config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Connect every store according to `STORE_BACKEND`.
///
/// The metadata, session and queue endpoints may point at different
/// databases; identical URLs share one pool.
pub async fn connect_stores(config: &Config) -> Result<Stores> {
    let session_ttl = Duration::from_secs(config.session_ttl_seconds);

    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Ok(Stores::in_memory(session_ttl))
        }
        StoreBackend::Postgres => {
            let metadata_pool = connect_pool(&config.database_url, config).await?;

            let session_pool = if config.session_store_url == config.database_url {
                metadata_pool.clone()
            } else {
                connect_pool(&config.session_store_url, config).await?
            };

            let queue_pool = if config.queue_url == config.database_url {
                metadata_pool.clone()
            } else if config.queue_url == config.session_store_url {
                session_pool.clone()
            } else {
                connect_pool(&config.queue_url, config).await?
            };

            tracing::info!("Database connections established");

            Ok(Stores {
                users: Arc::new(PgUserRepository::new(metadata_pool.clone())),
                files: Arc::new(PgFileRepository::new(metadata_pool)),
                sessions: Arc::new(PgSessionStore::new(session_pool, session_ttl)),
                jobs: Arc::new(PgJobStore::new(queue_pool)),
            })
        }
    }
}
