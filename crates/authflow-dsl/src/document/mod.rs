//! Document structures as they appear in YAML

use authflow_core::{FlowDefinition, GraphNode, ValidationError};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;

use crate::error_codes;

fn default_active() -> bool {
    true
}

/// A single flow document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDocument {
    /// Flow name, unique within its realm
    pub name: String,

    /// Route the flow is served under; defaults to the flow name
    #[serde(default)]
    pub route: Option<String>,

    /// Inactive flows are loaded but never served
    #[serde(default = "default_active")]
    pub active: bool,

    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Entry node name
    pub start: String,

    /// Nodes keyed by name
    #[serde(default)]
    pub nodes: HashMap<String, NodeDocument>,
}

/// A node as authored. Configuration values may be any YAML scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Optional explicit name; must match the mapping key when present
    #[serde(default)]
    pub name: Option<String>,

    /// Step type
    #[serde(rename = "use")]
    pub step_type: String,

    /// Condition label to target node
    #[serde(default)]
    pub next: HashMap<String, String>,

    /// Step configuration
    #[serde(default)]
    pub custom_config: HashMap<String, Value>,
}

/// A realm document bundling the flows of one tenant realm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealmDocument {
    /// Owning tenant
    pub tenant: String,

    /// Realm name
    pub realm: String,

    /// Flows served in the realm
    #[serde(default)]
    pub flows: Vec<FlowDocument>,
}

impl FlowDocument {
    /// Route with the flow name as fallback
    pub fn effective_route(&self) -> String {
        match &self.route {
            Some(route) if !route.trim().is_empty() => route.clone(),
            _ => self.name.clone(),
        }
    }

    /// Convert into a raw core definition
    pub fn to_definition(&self) -> Result<FlowDefinition, ValidationError> {
        let mut definition = FlowDefinition::new(self.name.clone(), self.start.clone())
            .with_description(self.description.clone().unwrap_or_default());

        for (key, node) in &self.nodes {
            let mut graph_node = GraphNode::new(
                node.name.clone().unwrap_or_else(|| key.clone()),
                node.step_type.clone(),
            );
            graph_node.next = node.next.clone();
            for (config_key, value) in &node.custom_config {
                let text = scalar_to_string(value).ok_or_else(|| ValidationError {
                    code: error_codes::INVALID_CONFIG,
                    message: format!("custom_config '{}' must be a scalar value", config_key),
                    path: Some(format!("nodes.{}.custom_config", key)),
                })?;
                graph_node.custom_config.insert(config_key.clone(), text);
            }
            definition.nodes.insert(key.clone(), graph_node);
        }

        Ok(definition)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}
