//! Health check handler.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "bridge": if state.bridge_configured { "configured" } else { "missing" },
    }))
}
