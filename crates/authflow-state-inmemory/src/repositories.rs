use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use authflow_core::{
    CoreError, ExecutionState, Flow, FlowRepository, Identity, IdentityStore, SessionStore,
};

/// Key for realm-scoped records
fn realm_key(tenant: &str, realm: &str, name: &str) -> String {
    format!("{}/{}/{}", tenant, realm, name)
}

/// In-memory implementation of the IdentityStore
#[derive(Default)]
pub struct InMemoryIdentityStore {
    identities: Arc<RwLock<HashMap<String, Identity>>>,
}

impl InMemoryIdentityStore {
    /// Create a new in-memory identity store
    pub fn new(identities: Arc<RwLock<HashMap<String, Identity>>>) -> Self {
        Self { identities }
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create(&self, identity: &Identity) -> Result<(), CoreError> {
        let key = realm_key(&identity.tenant, &identity.realm, &identity.username);
        let mut identities = self.identities.write().await;
        if identities.contains_key(&key) {
            return Err(CoreError::IdentityAlreadyExists(identity.username.clone()));
        }
        identities.insert(key, identity.clone());
        debug!(tenant = %identity.tenant, realm = %identity.realm, user_id = %identity.id, "Identity created");
        Ok(())
    }

    async fn find_by_username(
        &self,
        tenant: &str,
        realm: &str,
        username: &str,
    ) -> Result<Option<Identity>, CoreError> {
        let identities = self.identities.read().await;
        Ok(identities.get(&realm_key(tenant, realm, username)).cloned())
    }

    async fn find_by_id(
        &self,
        tenant: &str,
        realm: &str,
        id: &str,
    ) -> Result<Option<Identity>, CoreError> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .find(|i| i.tenant == tenant && i.realm == realm && i.id == id)
            .cloned())
    }

    async fn update(&self, identity: &Identity) -> Result<(), CoreError> {
        let key = realm_key(&identity.tenant, &identity.realm, &identity.username);
        let mut identities = self.identities.write().await;
        match identities.get_mut(&key) {
            Some(existing) if existing.id == identity.id => {
                *existing = identity.clone();
                Ok(())
            }
            _ => Err(CoreError::IdentityNotFound(identity.username.clone())),
        }
    }

    async fn record_failed_password_attempt(
        &self,
        tenant: &str,
        realm: &str,
        username: &str,
        max_attempts: u32,
    ) -> Result<Option<Identity>, CoreError> {
        let mut identities = self.identities.write().await;
        Ok(identities
            .get_mut(&realm_key(tenant, realm, username))
            .map(|identity| {
                identity.record_failed_password_attempt(max_attempts);
                identity.clone()
            }))
    }
}

struct StoredSession {
    state: ExecutionState,
    saved_at: Instant,
}

/// In-memory implementation of the SessionStore.
///
/// With a TTL configured, a session not saved within the TTL is treated as
/// absent and dropped on the next load.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    /// Create a session store without expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session store whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Some(ttl),
        }
    }

    fn is_expired(&self, stored: &StoredSession) -> bool {
        self.ttl
            .is_some_and(|ttl| stored.saved_at.elapsed() > ttl)
    }

    /// Drop every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| !self.is_expired(stored));
        let purged = before - sessions.len();
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }
        purged
    }

    /// Number of stored sessions, expired or not
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ExecutionState>, CoreError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(session_id) {
                None => return Ok(None),
                Some(stored) if !self.is_expired(stored) => return Ok(Some(stored.state.clone())),
                Some(_) => {}
            }
        }

        debug!(session_id = %session_id, "Session expired");
        self.sessions.write().await.remove(session_id);
        Ok(None)
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            state.session_id.clone(),
            StoredSession {
                state: state.clone(),
                saved_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), CoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

/// In-memory implementation of the FlowRepository
#[derive(Default)]
pub struct InMemoryFlowRepository {
    flows: Arc<RwLock<HashMap<String, Arc<Flow>>>>,
}

impl InMemoryFlowRepository {
    /// Create a new in-memory flow repository
    pub fn new(flows: Arc<RwLock<HashMap<String, Arc<Flow>>>>) -> Self {
        Self { flows }
    }
}

#[async_trait]
impl FlowRepository for InMemoryFlowRepository {
    async fn find_by_route(
        &self,
        tenant: &str,
        realm: &str,
        route: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError> {
        let flows = self.flows.read().await;
        Ok(flows
            .values()
            .find(|f| f.tenant == tenant && f.realm == realm && f.route == route)
            .cloned())
    }

    async fn find_by_name(
        &self,
        tenant: &str,
        realm: &str,
        name: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError> {
        let flows = self.flows.read().await;
        Ok(flows.get(&realm_key(tenant, realm, name)).cloned())
    }

    async fn save(&self, flow: Flow) -> Result<(), CoreError> {
        let key = realm_key(&flow.tenant, &flow.realm, flow.name());
        let mut flows = self.flows.write().await;
        let flow = match flows.get(&key) {
            Some(existing) => Flow {
                created_at: existing.created_at,
                ..flow
            },
            None => flow,
        };
        flows.insert(key, Arc::new(flow));
        Ok(())
    }

    async fn delete(&self, tenant: &str, realm: &str, name: &str) -> Result<(), CoreError> {
        let mut flows = self.flows.write().await;
        flows.remove(&realm_key(tenant, realm, name));
        Ok(())
    }

    async fn list(&self, tenant: &str, realm: &str) -> Result<Vec<Arc<Flow>>, CoreError> {
        let flows = self.flows.read().await;
        Ok(flows
            .values()
            .filter(|f| f.tenant == tenant && f.realm == realm)
            .cloned()
            .collect())
    }
}
