//! Server runner: bind, serve, shut down gracefully.

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

use hybridfs_core::error::AppError;
use hybridfs_core::result::AppResult;

use crate::router::build_router;
use crate::state::AppState;

/// Serve the API until `shutdown` resolves.
pub async fn run_server<F>(state: AppState, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!(addr = %addr, bridge_configured = state.bridge_configured, "HybridFS listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("HybridFS server stopped");
    Ok(())
}
