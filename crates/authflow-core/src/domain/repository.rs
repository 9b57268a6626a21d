//! Storage traits for the Authflow core
//!
//! The engine itself never touches storage. These traits are the seams the
//! server and the built-in steps depend on; `authflow-state-inmemory`
//! provides the default implementations.

use async_trait::async_trait;
use std::sync::Arc;

use super::execution_state::ExecutionState;
use super::flow_definition::Flow;
use super::identity::Identity;
use crate::CoreError;

/// Store of identities, partitioned by tenant and realm
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity. Fails with
    /// [`CoreError::IdentityAlreadyExists`] when the username is taken in
    /// the identity's realm; the check and insert are atomic.
    async fn create(&self, identity: &Identity) -> Result<(), CoreError>;

    /// Find an identity by username
    async fn find_by_username(
        &self,
        tenant: &str,
        realm: &str,
        username: &str,
    ) -> Result<Option<Identity>, CoreError>;

    /// Find an identity by id
    async fn find_by_id(
        &self,
        tenant: &str,
        realm: &str,
        id: &str,
    ) -> Result<Option<Identity>, CoreError>;

    /// Replace an existing identity
    async fn update(&self, identity: &Identity) -> Result<(), CoreError>;

    /// Count a failed password attempt against the stored identity, locking
    /// it once `max_attempts` is reached. The read and the write happen as
    /// one step in the store so concurrent failures are all counted.
    ///
    /// Returns the updated identity, or `None` if it no longer exists.
    async fn record_failed_password_attempt(
        &self,
        tenant: &str,
        realm: &str,
        username: &str,
        max_attempts: u32,
    ) -> Result<Option<Identity>, CoreError>;
}

/// Store of in-progress sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session
    async fn load(&self, session_id: &str) -> Result<Option<ExecutionState>, CoreError>;

    /// Insert or replace a session
    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError>;

    /// Delete a session
    async fn delete(&self, session_id: &str) -> Result<(), CoreError>;
}

/// Repository of deployed flows.
///
/// Only [`Flow`] values are accepted, and those can only wrap a validated
/// definition.
#[async_trait]
pub trait FlowRepository: Send + Sync {
    /// Find a flow by route
    async fn find_by_route(
        &self,
        tenant: &str,
        realm: &str,
        route: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError>;

    /// Find a flow by name
    async fn find_by_name(
        &self,
        tenant: &str,
        realm: &str,
        name: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError>;

    /// Insert or replace a flow, keyed by tenant, realm and name
    async fn save(&self, flow: Flow) -> Result<(), CoreError>;

    /// Delete a flow by name
    async fn delete(&self, tenant: &str, realm: &str, name: &str) -> Result<(), CoreError>;

    /// List flows in a realm
    async fn list(&self, tenant: &str, realm: &str) -> Result<Vec<Arc<Flow>>, CoreError>;
}
