//! Tokengate HTTP server

use anyhow::Context;
use tokengate_core::AppConfig;
use tokengate_server::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().context("Invalid configuration")?;
    log::info!("Starting tokengate-server v{}", tokengate_core::VERSION);
    log::info!("Quota day boundary: {}", config.day_boundary);

    let state = AppState::from_config(&config).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    log::info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
