//! Delivery of one-time codes

use async_trait::async_trait;
use authflow_core::{CoreError, Identity};

/// Delivers a one-time code to the user out of band (mail, SMS, ...)
#[async_trait]
pub trait CodeSender: Send + Sync {
    /// Send `code` to `identity`
    async fn send_code(&self, identity: &Identity, code: &str) -> Result<(), CoreError>;
}

/// Development sender that writes codes to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LoggingCodeSender;

#[async_trait]
impl CodeSender for LoggingCodeSender {
    async fn send_code(&self, identity: &Identity, code: &str) -> Result<(), CoreError> {
        tracing::info!(
            tenant = %identity.tenant,
            realm = %identity.realm,
            username = %identity.username,
            code = %code,
            "One-time code issued (logging sender, development only)"
        );
        Ok(())
    }
}
