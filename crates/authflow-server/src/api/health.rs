//! Health check endpoint for the Authflow Server

use axum::{response::IntoResponse, Json};
use serde_json::json;
use tracing::debug;

/// Health check handler
pub async fn health_check() -> impl IntoResponse {
    debug!("Health check requested");
    Json(json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
