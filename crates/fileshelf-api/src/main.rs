use fileshelf_api::setup;
use fileshelf_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    fileshelf_infra::init_tracing(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    let app = setup::initialize_app(config.clone()).await?;

    let served = setup::server::start_server(&config, app.router).await;
    app.background.shutdown().await;

    served
}
