//! # hybridfs-api
//!
//! HTTP API layer for HybridFS built on Axum: routes, middleware,
//! request DTOs, and the mapping from domain errors to status codes.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::run_server;
pub use router::build_router;
pub use state::AppState;
