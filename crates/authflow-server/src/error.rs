//! Error types for the Authflow Server

use authflow_core::CoreError;
use authflow_dsl::DslError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Request rejected as malformed or inconsistent
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Flow documents failed to load
    #[error("DSL error: {0}")]
    DslError(#[from] DslError),

    /// Engine or store error
    #[error("Core error: {0}")]
    CoreError(#[from] CoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        ServerError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::InternalError(format!("IO error: {}", err))
    }
}
