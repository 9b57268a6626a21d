//! In-memory state stores for Authflow
//!
//! This crate provides in-memory implementations of the storage traits
//! defined in authflow-core. It backs development servers and tests, and
//! small single-node deployments where losing sessions on restart is
//! acceptable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub mod repositories;
pub use repositories::{InMemoryFlowRepository, InMemoryIdentityStore, InMemorySessionStore};

use authflow_core::{Flow, FlowRepository, Identity, IdentityStore, SessionStore};

/// Provider for in-memory stores
pub struct InMemoryStateStoreProvider {
    // Shared storage for identities
    identities: Arc<RwLock<HashMap<String, Identity>>>,

    // Shared storage for deployed flows
    flows: Arc<RwLock<HashMap<String, Arc<Flow>>>>,

    // Sessions are owned by a single store so its TTL applies uniformly
    sessions: Arc<InMemorySessionStore>,
}

impl InMemoryStateStoreProvider {
    /// Create a provider whose sessions never expire
    pub fn new() -> Self {
        Self {
            identities: Arc::new(RwLock::new(HashMap::new())),
            flows: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(InMemorySessionStore::new()),
        }
    }

    /// Create a provider whose sessions expire after `ttl`
    pub fn with_session_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStore::with_ttl(ttl)),
            ..Self::new()
        }
    }

    /// The concrete session store, for maintenance such as purging
    pub fn session_store(&self) -> Arc<InMemorySessionStore> {
        self.sessions.clone()
    }

    /// Create the stores behind their trait objects. Repeated calls share
    /// the same underlying data.
    pub fn create_repositories(
        &self,
    ) -> (
        Arc<dyn IdentityStore>,
        Arc<dyn SessionStore>,
        Arc<dyn FlowRepository>,
    ) {
        let identity_store = Arc::new(InMemoryIdentityStore::new(self.identities.clone()));
        let flow_repo = Arc::new(InMemoryFlowRepository::new(self.flows.clone()));

        (identity_store, self.sessions.clone(), flow_repo)
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
