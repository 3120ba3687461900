// Analyst Gateway - HTTP entry point

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use analyst_gateway::server;
use analyst_gateway::state::AppState;
use analyst_gateway::storage::ConfigService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_service = ConfigService::new().context("Failed to load configuration")?;
    tracing::info!(
        "[Main] Loaded configuration from {}",
        config_service.config_path().display()
    );

    let state = AppState::from_config(config_service.get_config_clone())
        .context("Failed to initialize services")?;

    server::serve(Arc::new(state)).await.context("Server error")?;
    Ok(())
}
