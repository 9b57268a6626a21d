//! API module for the Authflow Server
//!
//! Flow round trips, flow listing and health.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod errors;
pub mod flows;
pub mod health;

use crate::server::AuthflowServer;

/// Header carrying the session id between round trips
pub const SESSION_HEADER: &str = "x-authflow-session";

/// Build the router for API endpoints
pub fn build_router(server: Arc<AuthflowServer>) -> Router {
    Router::new()
        // Flow round trips
        .route(
            "/:tenant/:realm/auth/*route",
            get(auth::start_or_resume).post(auth::submit),
        )
        // Flow listing
        .route("/:tenant/:realm/flows", get(flows::list_flows))
        // Health check
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}
