use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// A named node in a flow graph.
///
/// A node binds a registered step type to a position in the graph and maps
/// each condition label the step may produce to the name of the next node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node name, unique within its flow
    #[serde(default)]
    pub name: String,

    /// Registered step type executed at this node
    #[serde(rename = "use")]
    pub step_type: String,

    /// Condition label to target node name
    #[serde(default)]
    pub next: HashMap<String, String>,

    /// Free-form configuration handed to the step
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_config: HashMap<String, String>,
}

impl GraphNode {
    /// Create a node with no transitions
    pub fn new(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            next: HashMap::new(),
            custom_config: HashMap::new(),
        }
    }

    /// Add a transition
    pub fn with_next(mut self, condition: impl Into<String>, target: impl Into<String>) -> Self {
        self.next.insert(condition.into(), target.into());
        self
    }

    /// Add a configuration entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_config.insert(key.into(), value.into());
        self
    }

    /// Target node for a condition label
    pub fn next_node(&self, condition: &str) -> Option<&str> {
        self.next.get(condition).map(String::as_str)
    }

    /// Raw configuration value
    pub fn config(&self, key: &str) -> Option<&str> {
        self.custom_config.get(key).map(String::as_str)
    }

    /// Configuration value parsed into `T`, falling back to `default` when
    /// absent or unparsable
    pub fn config_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.config(key)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(default)
    }
}

/// Raw, unvalidated flow definition as authored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDefinition {
    /// Flow name, unique within a realm
    #[serde(default)]
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Name of the entry node
    pub start: String,

    /// Nodes keyed by name
    #[serde(default)]
    pub nodes: HashMap<String, GraphNode>,
}

impl FlowDefinition {
    /// Create an empty definition
    pub fn new(name: impl Into<String>, start: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            start: start.into(),
            nodes: HashMap::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a node keyed by its name
    pub fn with_node(mut self, node: GraphNode) -> Self {
        self.nodes.insert(node.name.clone(), node);
        self
    }

    /// Look up a node
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.get(name)
    }
}

/// A flow definition that passed load-time validation.
///
/// The only way to obtain one is through
/// [`validate_flow`](crate::validation::validate_flow), so the engine never
/// sees a graph with dangling edges or unknown step types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedFlow {
    definition: FlowDefinition,
}

impl ValidatedFlow {
    pub(crate) fn from_checked(definition: FlowDefinition) -> Self {
        Self { definition }
    }

    /// Flow name
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Flow description
    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Entry node name
    pub fn start(&self) -> &str {
        &self.definition.start
    }

    /// Look up a node
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.definition.node(name)
    }

    /// All nodes keyed by name
    pub fn nodes(&self) -> &HashMap<String, GraphNode> {
        &self.definition.nodes
    }

    /// The underlying definition
    pub fn definition(&self) -> &FlowDefinition {
        &self.definition
    }
}

/// A deployed flow: a validated definition plus its routing envelope.
#[derive(Debug, Clone)]
pub struct Flow {
    /// Owning tenant
    pub tenant: String,

    /// Owning realm
    pub realm: String,

    /// Route the flow is served under, without leading slash
    pub route: String,

    /// Inactive flows are never served
    pub active: bool,

    /// The validated graph
    pub definition: Arc<ValidatedFlow>,

    /// Source text the definition was loaded from, kept for diagnostics
    pub definition_source: String,

    /// Deployment time
    pub created_at: DateTime<Utc>,

    /// Last redeployment time
    pub updated_at: DateTime<Utc>,
}

impl Flow {
    /// Wrap a validated definition for deployment
    pub fn new(
        tenant: impl Into<String>,
        realm: impl Into<String>,
        route: impl Into<String>,
        definition: ValidatedFlow,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant: tenant.into(),
            realm: realm.into(),
            route: normalize_route(&route.into()),
            active: true,
            definition: Arc::new(definition),
            definition_source: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Attach the source document
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.definition_source = source.into();
        self
    }

    /// Flow name, taken from the definition
    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

/// Strip surrounding slashes so `/login/` and `login` address the same flow
pub fn normalize_route(route: &str) -> String {
    route.trim().trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_node_builders() {
        let node = GraphNode::new("askUsername", "askUsername")
            .with_next("submitted", "checkUsername")
            .with_config("label", "Email");

        assert_eq!(node.next_node("submitted"), Some("checkUsername"));
        assert_eq!(node.next_node("missing"), None);
        assert_eq!(node.config("label"), Some("Email"));
    }

    #[test]
    fn test_config_or_falls_back() {
        let node = GraphNode::new("otp", "oneTimeCode")
            .with_config("ttl_seconds", "120")
            .with_config("max_attempts", "lots");

        assert_eq!(node.config_or("ttl_seconds", 300u64), 120);
        assert_eq!(node.config_or("max_attempts", 3u32), 3);
        assert_eq!(node.config_or("absent", 7u32), 7);
    }

    #[test]
    fn test_graph_node_deserializes_use_key() {
        let json = r#"{"use": "setVariable", "next": {"done": "end"}, "custom_config": {"key": "k"}}"#;
        let node: GraphNode = serde_json::from_str(json).unwrap();

        assert_eq!(node.step_type, "setVariable");
        assert_eq!(node.name, "");
        assert_eq!(node.next_node("done"), Some("end"));
    }

    #[test]
    fn test_flow_route_is_normalized() {
        let definition = FlowDefinition::new("login", "init");
        let flow = Flow::new("acme", "customers", "/login/", ValidatedFlow::from_checked(definition));

        assert_eq!(flow.route, "login");
        assert_eq!(flow.name(), "login");
        assert!(flow.active);
    }
}
