use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use firenews_api::build_router;
use firenews_common::Config;
use firenews_core::FireNews;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("firenews=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let deps = FireNews::from_config(&config)
        .await
        .context("Failed to initialise services")?;

    let app = build_router(deps, &config.allowed_origin);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(
        backend = ?config.storage_backend,
        model_version = %config.model_version,
        "FIRE news API starting on {addr}"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
