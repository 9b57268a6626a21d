//! Server state and the per-request flow driver

use authflow_core::{
    EngineOutcome, ExecutionState, Flow, FlowDefinitionService, FlowEngine, FlowResult, Prompts,
    SessionStore, SubmittedInput,
};
use authflow_dsl::load_realms_dir;
use authflow_state_inmemory::{InMemorySessionStore, InMemoryStateStoreProvider};
use authflow_stdlib::{standard_registry, StdlibServices};
use dashmap::DashMap;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// What a client sees after one round trip
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FlowResponse {
    /// The flow waits for input
    Prompt {
        /// Session to resume
        session_id: String,
        /// Node the session is parked on
        node: String,
        /// Fields to collect
        prompts: Prompts,
        /// Message to show with the prompts
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// The flow finished
    Complete {
        /// Finished session
        session_id: String,
        /// Outcome of the flow
        result: FlowResult,
    },

    /// The round trip aborted; the session is unchanged
    Error {
        /// Session to retry
        session_id: String,
        /// Generic failure notice
        error: String,
        /// Whether re-sending the same request may succeed
        retryable: bool,
    },
}

/// Summary of a served flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSummary {
    /// Flow name
    pub name: String,
    /// Route under `/{tenant}/{realm}/auth/`
    pub route: String,
    /// Description
    pub description: String,
}

/// Main server implementation
#[derive(Clone)]
pub struct AuthflowServer {
    /// Configuration
    pub config: ServerConfig,

    engine: FlowEngine,

    flows: Arc<FlowDefinitionService>,

    sessions: Arc<dyn SessionStore>,

    // One lock per in-flight session id
    session_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,

    // Set when sessions expire and need periodic purging
    expiring_sessions: Option<Arc<InMemorySessionStore>>,
}

impl std::fmt::Debug for AuthflowServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthflowServer")
            .field("config", &self.config)
            .field("active_sessions", &self.session_locks.len())
            .finish()
    }
}

impl AuthflowServer {
    /// Create a server over already built collaborators
    pub fn new(
        config: ServerConfig,
        engine: FlowEngine,
        flows: Arc<FlowDefinitionService>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            engine,
            flows,
            sessions,
            session_locks: Arc::new(DashMap::new()),
            expiring_sessions: None,
        }
    }

    /// Build the in-memory stores and standard steps, then deploy every
    /// realm document found in `realms_dir`
    pub async fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let provider = if config.session_ttl_seconds > 0 {
            InMemoryStateStoreProvider::with_session_ttl(Duration::from_secs(config.session_ttl_seconds))
        } else {
            InMemoryStateStoreProvider::new()
        };
        let (identities, sessions, flow_repo) = provider.create_repositories();

        let registry = Arc::new(standard_registry(&StdlibServices::new(identities))?);
        let engine = FlowEngine::new(registry.clone())
            .with_max_transitions(config.max_transitions_per_advance);
        let flows = Arc::new(FlowDefinitionService::new(registry.clone(), flow_repo));

        if let Some(dir) = &config.realms_dir {
            let loaded = load_realms_dir(dir, &registry)?;
            info!(dir = %dir.display(), flows = loaded.len(), "Deploying realm documents");
            for flow in loaded {
                flows.deploy(flow).await?;
            }
        } else {
            warn!("No realms_dir configured; serving no flows");
        }

        let mut server = Self::new(config, engine, flows, sessions);
        if server.config.session_ttl_seconds > 0 {
            server.expiring_sessions = Some(provider.session_store());
        }
        Ok(server)
    }

    /// Deployed flows
    pub fn flows(&self) -> &FlowDefinitionService {
        &self.flows
    }

    /// Run the server until interrupted
    pub async fn run(self) -> ServerResult<()> {
        info!("Starting Authflow Server");

        if let Some(store) = self.expiring_sessions.clone() {
            let every = Duration::from_secs(self.config.session_ttl_seconds.max(1));
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                loop {
                    ticker.tick().await;
                    store.purge_expired().await;
                }
            });
        }

        let app = crate::api::build_router(Arc::new(self.clone()));

        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| ServerError::ConfigError(format!("invalid bind address: {}", e)))?;
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Authflow Server stopped");
        Ok(())
    }

    /// Active flows of a realm
    pub async fn list_flows(&self, tenant: &str, realm: &str) -> ServerResult<Vec<FlowSummary>> {
        let flows = self.flows.list(tenant, realm).await?;
        Ok(flows
            .iter()
            .filter(|flow| flow.active)
            .map(|flow| FlowSummary {
                name: flow.name().to_string(),
                route: flow.route.clone(),
                description: flow.definition.description().to_string(),
            })
            .collect())
    }

    /// Run one round trip of the flow served under `route`.
    ///
    /// Without a session id, or with one the store no longer knows, a new
    /// session starts. Requests for the same session are serialized.
    pub async fn advance(
        &self,
        tenant: &str,
        realm: &str,
        route: &str,
        session_id: Option<&str>,
        input: Option<SubmittedInput>,
    ) -> ServerResult<FlowResponse> {
        let flow = self
            .flows
            .lookup_by_route(tenant, realm, route)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Flow '{}'", route)))?;

        let Some(session_id) = session_id else {
            let mut state = ExecutionState::start(tenant, realm, &flow.definition);
            debug!(session_id = %state.session_id, flow = %flow.name(), "Starting session");
            return self.drive(&flow, &mut state, input).await;
        };

        let lock = self
            .session_locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        let result = match self.sessions.load(session_id).await {
            Ok(Some(mut state)) => {
                if state.tenant != tenant || state.realm != realm || state.flow_name != flow.name() {
                    Err(ServerError::ValidationError(format!(
                        "session '{}' does not belong to flow '{}'",
                        session_id,
                        flow.name()
                    )))
                } else {
                    self.drive(&flow, &mut state, input).await
                }
            }
            Ok(None) => {
                debug!(session_id = %session_id, "Unknown or expired session; starting over");
                let mut state = ExecutionState::start(tenant, realm, &flow.definition);
                self.drive(&flow, &mut state, input).await
            }
            Err(e) => Err(e.into()),
        };

        drop(guard);
        self.session_locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn drive(
        &self,
        flow: &Flow,
        state: &mut ExecutionState,
        input: Option<SubmittedInput>,
    ) -> ServerResult<FlowResponse> {
        let outcome = self.engine.advance(&flow.definition, state, input).await;
        let session_id = state.session_id.clone();

        match outcome {
            EngineOutcome::Prompts {
                node,
                prompts,
                error,
            } => {
                self.sessions.save(state).await?;
                Ok(FlowResponse::Prompt {
                    session_id,
                    node,
                    prompts,
                    error,
                })
            }
            EngineOutcome::Result(result) => {
                self.sessions.delete(&session_id).await?;
                info!(
                    tenant = %state.tenant,
                    realm = %state.realm,
                    flow = %flow.name(),
                    authenticated = result.authenticated,
                    "Flow completed"
                );
                Ok(FlowResponse::Complete { session_id, result })
            }
            EngineOutcome::Error(fault) => {
                error!(
                    session_id = %session_id,
                    flow = %flow.name(),
                    node = %state.current,
                    error = %fault,
                    "Flow round trip failed"
                );
                self.sessions.save(state).await?;
                Ok(FlowResponse::Error {
                    session_id,
                    error: fault.public_message().to_string(),
                    retryable: fault.is_retryable(),
                })
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
