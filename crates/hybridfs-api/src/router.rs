//! Route definitions for the HybridFS HTTP API.
//!
//! Paths match the ones the web client and the bridge watcher already call.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::compression::CompressionLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Multipart framing allowance on top of the upload size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = usize::try_from(state.config.storage.max_upload_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .merge(file_routes())
        .merge(folder_routes())
        .merge(sync_routes())
        .route("/", get(handlers::health::health))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::timeout::request_timeout,
        ))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Upload, remove, download.
fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::file::upload_file))
        .route("/remove", delete(handlers::file::remove_file))
        .route("/download", get(handlers::file::download_file))
}

/// Folder management, listing, stats.
fn folder_routes() -> Router<AppState> {
    Router::new()
        .route("/folder/create", post(handlers::folder::create_folder))
        .route("/folder", delete(handlers::folder::delete_folder))
        .route("/content", get(handlers::folder::list_content))
        .route("/stats", get(handlers::folder::storage_stats))
}

/// Reconciliation events from the bridge.
fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/sync-add", post(handlers::sync::sync_add))
        .route("/sync-remove", post(handlers::sync::sync_remove))
        .route("/sync-folder", post(handlers::sync::sync_folder))
        .route("/sync-remove-folder", post(handlers::sync::sync_remove_folder))
}
