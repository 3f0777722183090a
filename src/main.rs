use anyhow::Context;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::info;

use eventos_backend::{config, create_router, db, i18n, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let telemetry = telemetry::init_telemetry(None).await?;

    let config = config::init().context("Failed to load configuration")?;
    let localizer = i18n::init_i18n(config.app.default_language).context("Failed to load translations")?;
    let repo = db::init_repository(config).await?;

    let state = AppState::new(repo, config.clone(), Arc::new(localizer));
    let app = create_router(state);

    let addr = config.server_addr();
    info!("{} ({:?}) listening on {}", config.app.name, config.app.environment, addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to serve application")?;

    telemetry.shutdown().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
