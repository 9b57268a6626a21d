use super::{error_codes, sorted_nodes, FlowRule, ValidationError};
use crate::domain::flow_definition::FlowDefinition;
use crate::domain::step::StepCategory;
use crate::registry::StepRegistry;

/// Non-empty graph and node names agreeing with their keys
pub(crate) struct StructureRule;

impl FlowRule for StructureRule {
    fn check(&self, definition: &FlowDefinition, _registry: &StepRegistry) -> Vec<ValidationError> {
        if definition.nodes.is_empty() {
            return vec![ValidationError::new(
                error_codes::EMPTY_FLOW,
                "flow has no nodes".to_string(),
                Some("nodes".to_string()),
            )];
        }

        sorted_nodes(definition)
            .into_iter()
            .filter(|(key, node)| node.name != **key)
            .map(|(key, node)| {
                ValidationError::at_node(
                    error_codes::NAME_MISMATCH,
                    key,
                    format!("node declared under '{}' is named '{}'", key, node.name),
                )
            })
            .collect()
    }
}

/// Exactly one Entry node, and it is the designated start node
pub(crate) struct EntryRule;

impl FlowRule for EntryRule {
    fn check(&self, definition: &FlowDefinition, registry: &StepRegistry) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if definition.nodes.is_empty() {
            return errors;
        }

        match definition.node(&definition.start) {
            None => errors.push(ValidationError::new(
                error_codes::MISSING_START,
                format!("start node '{}' does not exist in flow", definition.start),
                Some("start".to_string()),
            )),
            Some(node) => {
                if let Some(contract) = registry.contract(&node.step_type) {
                    if contract.category != StepCategory::Entry {
                        errors.push(ValidationError::at_node(
                            error_codes::INVALID_ENTRY,
                            &definition.start,
                            format!(
                                "start node '{}' must be of category Entry, but step '{}' is {}",
                                definition.start, node.step_type, contract.category
                            ),
                        ));
                    }
                }
            }
        }

        for (name, node) in sorted_nodes(definition) {
            if *name == definition.start {
                continue;
            }
            let is_entry = registry
                .contract(&node.step_type)
                .is_some_and(|c| c.category == StepCategory::Entry);
            if is_entry {
                errors.push(ValidationError::at_node(
                    error_codes::MULTIPLE_ENTRIES,
                    name,
                    format!(
                        "node '{}' is an Entry step but '{}' is the start node; a flow has exactly one entry point",
                        name, definition.start
                    ),
                ));
            }
        }

        errors
    }
}

/// Every node uses a registered step type
pub(crate) struct StepReferenceRule;

impl FlowRule for StepReferenceRule {
    fn check(&self, definition: &FlowDefinition, registry: &StepRegistry) -> Vec<ValidationError> {
        sorted_nodes(definition)
            .into_iter()
            .filter(|(_, node)| !registry.contains(&node.step_type))
            .map(|(name, node)| {
                ValidationError::at_node(
                    error_codes::UNKNOWN_STEP_TYPE,
                    name,
                    format!("node '{}' uses unknown step type '{}'", name, node.step_type),
                )
            })
            .collect()
    }
}

/// Transitions exist where required, resolve to nodes, and use declared labels
pub(crate) struct TransitionRule;

impl FlowRule for TransitionRule {
    fn check(&self, definition: &FlowDefinition, registry: &StepRegistry) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (name, node) in sorted_nodes(definition) {
            let contract = registry.contract(&node.step_type);
            let terminal = contract.is_some_and(|c| c.category == StepCategory::Terminal);

            if !terminal && node.next.is_empty() {
                errors.push(ValidationError::at_node(
                    error_codes::MISSING_TRANSITIONS,
                    name,
                    format!("node '{}' must define outgoing transitions in its 'next' map", name),
                ));
                continue;
            }

            let mut edges: Vec<_> = node.next.iter().collect();
            edges.sort();

            for (condition, target) in edges {
                if !definition.nodes.contains_key(target) {
                    errors.push(ValidationError::at_node(
                        error_codes::DANGLING_EDGE,
                        name,
                        format!(
                            "dangling edge: condition '{}' of node '{}' targets missing node '{}'",
                            condition, name, target
                        ),
                    ));
                }

                if let Some(contract) = contract {
                    if !contract.declares_condition(condition) {
                        let declared = if contract.conditions.is_empty() {
                            "none".to_string()
                        } else {
                            contract.conditions.join(", ")
                        };
                        errors.push(ValidationError::at_node(
                            error_codes::UNDECLARED_CONDITION,
                            name,
                            format!(
                                "condition '{}' is not declared by step '{}' (declared: {})",
                                condition, node.step_type, declared
                            ),
                        ));
                    }
                }
            }
        }

        errors
    }
}
