// server/src/main.rs

// Entry point for the Life Code API server: configuration and logging init,
// store wiring, and graceful shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rest_api::{load_rest_api_config, start_server};
use storage::SledProfileStorage;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_rest_api_config(None).context("Failed to load REST API configuration")?;

    info!("Opening profile store at {:?}", config.data_directory);
    let store = Arc::new(
        SledProfileStorage::open(&config.data_directory)
            .context("Failed to open profile store")?,
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Ctrl-C received, shutting down.");
        let _ = shutdown_tx.send(());
    });

    start_server(config, store, shutdown_rx).await
}
