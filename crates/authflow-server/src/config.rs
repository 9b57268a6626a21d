//! Configuration for the Authflow Server
//!
//! Values come from built-in defaults, then an optional YAML file
//! (`AUTHFLOW_CONFIG`, default `authflow.yaml`), then `AUTHFLOW_*`
//! environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::info;

use crate::error::ServerResult;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AUTHFLOW_CONFIG";

/// Config file read when `AUTHFLOW_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "authflow.yaml";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub bind_address: String,

    /// Port to listen on
    pub port: u16,

    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Directory of realm documents deployed at startup
    pub realms_dir: Option<PathBuf>,

    /// Idle time after which a session is forgotten; 0 keeps sessions forever
    pub session_ttl_seconds: u64,

    /// Node visits allowed per advance
    pub max_transitions_per_advance: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
            realms_dir: None,
            session_ttl_seconds: 900,
            max_transitions_per_advance: authflow_core::DEFAULT_MAX_TRANSITIONS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the file named by `AUTHFLOW_CONFIG` and the
    /// environment
    pub fn load() -> ServerResult<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from `path` (optional) and the environment
    pub fn load_from(path: &str) -> ServerResult<Self> {
        let config: ServerConfig = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("AUTHFLOW").try_parsing(true))
            .build()?
            .try_deserialize()?;

        info!(
            bind_address = %config.bind_address,
            port = config.port,
            realms_dir = ?config.realms_dir,
            "Loaded server configuration"
        );
        Ok(config)
    }
}
