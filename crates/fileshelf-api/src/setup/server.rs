//! Server startup and graceful shutdown

use anyhow::Result;
use axum::Router;
use fileshelf_core::Config;
use fileshelf_infra::shutdown_signal;

/// Start the server with graceful shutdown
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        environment = %config.environment,
        store_backend = ?config.store_backend,
        folder_path = %config.folder_path.display(),
        worker_enabled = config.worker_enabled,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
