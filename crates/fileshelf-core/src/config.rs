//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env`
//! with `dotenvy`). Every option has a default so a bare `cargo run` works
//! against a local PostgreSQL.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_FOLDER_PATH, SESSION_TTL_SECONDS};

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/files_manager";
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SESSION_PURGE_INTERVAL_SECS: u64 = 300;
const WORKER_CONCURRENCY: usize = 2;
const WORKER_POLL_INTERVAL_MS: u64 = 500;
const JOB_LEASE_SECONDS: u64 = 300;
const JOB_MAX_BACKOFF_SECS: u64 = 300;

/// Which implementation backs the session, metadata and job stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow::anyhow!(
                "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

/// Application configuration shared by the API and worker binaries.
#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub server_port: u16,
    pub environment: String,
    pub folder_path: PathBuf,
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub session_store_url: String,
    pub queue_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
    /// Interval between purges of expired session rows. 0 = disabled.
    pub session_purge_interval_secs: u64,
    pub worker_enabled: bool,
    pub worker_concurrency: usize,
    pub worker_poll_interval_ms: u64,
    pub job_lease_seconds: u64,
    /// 0 = redeliver until acknowledged.
    pub job_max_attempts: u32,
    pub job_max_backoff_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let store_backend = match lookup("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => StoreBackend::Postgres,
        };

        let config = Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            environment,
            folder_path: PathBuf::from(
                lookup("FOLDER_PATH").unwrap_or_else(|| DEFAULT_FOLDER_PATH.to_string()),
            ),
            store_backend,
            session_store_url: lookup("SESSION_STORE_URL").unwrap_or_else(|| database_url.clone()),
            queue_url: lookup("QUEUE_URL").unwrap_or_else(|| database_url.clone()),
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", MAX_CONNECTIONS)?,
            db_timeout_seconds: parse_or(&lookup, "DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS)?,
            session_ttl_seconds: parse_or(&lookup, "SESSION_TTL_SECONDS", SESSION_TTL_SECONDS)?,
            session_purge_interval_secs: parse_or(
                &lookup,
                "SESSION_PURGE_INTERVAL_SECS",
                SESSION_PURGE_INTERVAL_SECS,
            )?,
            worker_enabled: parse_or(&lookup, "WORKER_ENABLED", true)?,
            worker_concurrency: parse_or(&lookup, "WORKER_CONCURRENCY", WORKER_CONCURRENCY)?,
            worker_poll_interval_ms: parse_or(
                &lookup,
                "WORKER_POLL_INTERVAL_MS",
                WORKER_POLL_INTERVAL_MS,
            )?,
            job_lease_seconds: parse_or(&lookup, "JOB_LEASE_SECONDS", JOB_LEASE_SECONDS)?,
            job_max_attempts: parse_or(&lookup, "JOB_MAX_ATTEMPTS", 0)?,
            job_max_backoff_secs: parse_or(&lookup, "JOB_MAX_BACKOFF_SECS", JOB_MAX_BACKOFF_SECS)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.session_ttl_seconds == 0 {
            return Err(anyhow::anyhow!("SESSION_TTL_SECONDS must be greater than 0"));
        }
        if self.worker_concurrency == 0 {
            return Err(anyhow::anyhow!("WORKER_CONCURRENCY must be greater than 0"));
        }
        if self.job_lease_seconds == 0 {
            return Err(anyhow::anyhow!("JOB_LEASE_SECONDS must be greater than 0"));
        }
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", key, raw)),
        None => Ok(default),
    }
}
