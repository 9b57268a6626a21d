//! Load-time flow validation
//!
//! Every flow passes through [`validate_flow`] before it can be deployed.
//! All rules run and every violation is reported, so an author sees the
//! whole list at once rather than fixing one error per reload.

use crate::domain::flow_definition::{FlowDefinition, GraphNode, ValidatedFlow};
use crate::registry::StepRegistry;
use std::error::Error;
use std::fmt;

mod rules;

/// A single rule violation found while validating a flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error code (one of [`error_codes`])
    pub code: &'static str,

    /// Human-readable error message
    pub message: String,

    /// Optional location of the error (e.g. "nodes.askUsername")
    pub path: Option<String>,
}

impl ValidationError {
    pub(crate) fn new(code: &'static str, message: String, path: Option<String>) -> Self {
        Self {
            code,
            message,
            path,
        }
    }

    pub(crate) fn at_node(code: &'static str, node: &str, message: String) -> Self {
        Self::new(code, message, Some(format!("nodes.{}", node)))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationError {}

/// Validation error codes
pub mod error_codes {
    /// Flow has no nodes
    pub const EMPTY_FLOW: &str = "ERR_FLOW_EMPTY";

    /// Designated entry node is missing
    pub const MISSING_START: &str = "ERR_FLOW_MISSING_START";

    /// Designated entry node is not an Entry step
    pub const INVALID_ENTRY: &str = "ERR_FLOW_INVALID_ENTRY";

    /// More than one Entry node
    pub const MULTIPLE_ENTRIES: &str = "ERR_FLOW_MULTIPLE_ENTRIES";

    /// Node references an unregistered step type
    pub const UNKNOWN_STEP_TYPE: &str = "ERR_FLOW_UNKNOWN_STEP_TYPE";

    /// Non-terminal node without transitions
    pub const MISSING_TRANSITIONS: &str = "ERR_FLOW_MISSING_TRANSITIONS";

    /// Transition targets a node that does not exist
    pub const DANGLING_EDGE: &str = "ERR_FLOW_DANGLING_EDGE";

    /// Transition label the step does not declare
    pub const UNDECLARED_CONDITION: &str = "ERR_FLOW_UNDECLARED_CONDITION";

    /// Node name differs from its mapping key
    pub const NAME_MISMATCH: &str = "ERR_FLOW_NAME_MISMATCH";
}

/// A single validation rule
pub trait FlowRule {
    /// Check the definition and return every violation found
    fn check(&self, definition: &FlowDefinition, registry: &StepRegistry) -> Vec<ValidationError>;
}

/// Validate a raw definition against the registry.
///
/// Node names left empty are filled from their mapping keys first. On
/// success the definition is wrapped in a [`ValidatedFlow`], the only type
/// the engine and the flow repository accept.
pub fn validate_flow(
    mut definition: FlowDefinition,
    registry: &StepRegistry,
) -> Result<ValidatedFlow, Vec<ValidationError>> {
    for (key, node) in definition.nodes.iter_mut() {
        if node.name.is_empty() {
            node.name = key.clone();
        }
    }

    let rules: Vec<Box<dyn FlowRule>> = vec![
        Box::new(rules::StructureRule),
        Box::new(rules::EntryRule),
        Box::new(rules::StepReferenceRule),
        Box::new(rules::TransitionRule),
    ];

    let mut errors = Vec::new();
    for rule in rules {
        errors.extend(rule.check(&definition, registry));
    }

    if errors.is_empty() {
        tracing::debug!(flow = %definition.name, nodes = definition.nodes.len(), "Flow definition validated");
        Ok(ValidatedFlow::from_checked(definition))
    } else {
        tracing::debug!(flow = %definition.name, errors = errors.len(), "Flow definition rejected");
        Err(errors)
    }
}

/// Nodes ordered by name, so reported errors are stable
pub(crate) fn sorted_nodes(definition: &FlowDefinition) -> Vec<(&String, &GraphNode)> {
    let mut nodes: Vec<_> = definition.nodes.iter().collect();
    nodes.sort_by(|a, b| a.0.cmp(b.0));
    nodes
}
