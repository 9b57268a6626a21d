use crate::{
    domain::flow_definition::{normalize_route, Flow, FlowDefinition},
    domain::repository::FlowRepository,
    registry::StepRegistry,
    validation::validate_flow,
    CoreError,
};
use std::sync::Arc;

/// Service for deploying and resolving flows
pub struct FlowDefinitionService {
    /// Registry definitions are validated against
    registry: Arc<StepRegistry>,

    /// Repository for deployed flows
    flow_repo: Arc<dyn FlowRepository>,
}

impl FlowDefinitionService {
    /// Create a new flow definition service
    pub fn new(registry: Arc<StepRegistry>, flow_repo: Arc<dyn FlowRepository>) -> Self {
        Self {
            registry,
            flow_repo,
        }
    }

    /// Validate a raw definition and deploy it under `route`.
    ///
    /// Every validation violation is folded into a single
    /// [`CoreError::ValidationError`].
    pub async fn deploy_definition(
        &self,
        tenant: &str,
        realm: &str,
        route: &str,
        definition: FlowDefinition,
        active: bool,
    ) -> Result<Arc<Flow>, CoreError> {
        let name = definition.name.clone();
        let validated = validate_flow(definition, &self.registry).map_err(|errors| {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            CoreError::ValidationError(format!("flow '{}': {}", name, details.join("; ")))
        })?;

        let flow = Flow::new(tenant, realm, route, validated).with_active(active);
        self.deploy(flow).await
    }

    /// Deploy an already validated flow, replacing any flow of the same name
    pub async fn deploy(&self, flow: Flow) -> Result<Arc<Flow>, CoreError> {
        let (tenant, realm, name) = (flow.tenant.clone(), flow.realm.clone(), flow.name().to_string());

        if let Some(existing) = self.flow_repo.find_by_route(&tenant, &realm, &flow.route).await? {
            if existing.name() != name {
                return Err(CoreError::ValidationError(format!(
                    "route '{}' is already served by flow '{}'",
                    flow.route,
                    existing.name()
                )));
            }
        }

        tracing::info!(
            tenant = %tenant,
            realm = %realm,
            flow = %name,
            route = %flow.route,
            active = flow.active,
            "Flow deployed"
        );
        self.flow_repo.save(flow).await?;

        self.flow_repo
            .find_by_name(&tenant, &realm, &name)
            .await?
            .ok_or_else(|| CoreError::FlowRepositoryError(format!("flow '{}' vanished after save", name)))
    }

    /// Resolve the active flow served under `route`
    pub async fn lookup_by_route(
        &self,
        tenant: &str,
        realm: &str,
        route: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError> {
        let flow = self
            .flow_repo
            .find_by_route(tenant, realm, &normalize_route(route))
            .await?;
        Ok(flow.filter(|f| f.active))
    }

    /// Resolve a flow by name, active or not
    pub async fn lookup_by_name(
        &self,
        tenant: &str,
        realm: &str,
        name: &str,
    ) -> Result<Option<Arc<Flow>>, CoreError> {
        self.flow_repo.find_by_name(tenant, realm, name).await
    }

    /// List flows in a realm, sorted by route
    pub async fn list(&self, tenant: &str, realm: &str) -> Result<Vec<Arc<Flow>>, CoreError> {
        let mut flows = self.flow_repo.list(tenant, realm).await?;
        flows.sort_by(|a, b| a.route.cmp(&b.route));
        Ok(flows)
    }

    /// Remove a flow
    pub async fn undeploy(&self, tenant: &str, realm: &str, name: &str) -> Result<(), CoreError> {
        if self.flow_repo.find_by_name(tenant, realm, name).await?.is_none() {
            return Err(CoreError::FlowNotFound(name.to_string()));
        }
        self.flow_repo.delete(tenant, realm, name).await?;

        tracing::info!(tenant = %tenant, realm = %realm, flow = %name, "Flow undeployed");
        Ok(())
    }
}
