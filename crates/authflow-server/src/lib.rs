//!
//! Authflow Server - HTTP identity server running authentication flows
//!
//! Each request is one round trip of a session through a flow. Sessions are
//! identified by the `x-authflow-session` header and persisted between
//! round trips.

#![forbid(unsafe_code)]

/// API module
pub mod api;

/// Server module
pub mod server;

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{AuthflowServer, FlowResponse, FlowSummary};

/// Build the server from configuration and serve until interrupted
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    let server = AuthflowServer::from_config(config).await?;
    server.run().await
}

/// Initialize logging
pub fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
