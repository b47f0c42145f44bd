//! HybridFS server: hybrid local/cloud file metadata and reconciliation.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use hybridfs_api::{AppState, run_server};
use hybridfs_core::config::AppConfig;
use hybridfs_core::result::AppResult;
use hybridfs_database::DatabasePool;
use hybridfs_database::repositories::file::FileRepository;
use hybridfs_database::repositories::folder::FolderRepository;
use hybridfs_storage::{HttpBridgeClient, S3ObjectStore};

#[tokio::main]
async fn main() {
    let env = std::env::var("HYBRIDFS_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> AppResult<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting HybridFS");

    let database = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        hybridfs_database::migration::run_migrations(database.pool()).await?;
    }

    let bridge = HttpBridgeClient::new(&config.storage.bridge)?;
    if !config.storage.bridge.is_configured() {
        tracing::warn!("No bridge URL configured; every upload will go to the cloud");
    }
    let cloud = S3ObjectStore::connect(&config.storage.cloud).await?;

    let state = AppState::new(
        config,
        Arc::new(FolderRepository::new(database.pool().clone())),
        Arc::new(FileRepository::new(database.pool().clone())),
        Arc::new(bridge),
        Arc::new(cloud),
    );

    run_server(state, shutdown_signal()).await?;

    database.close().await;
    tracing::info!("HybridFS shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
