//! The flow engine
//!
//! [`FlowEngine::advance`] drives one session through its flow graph for a
//! single inbound request. It walks nodes in a loop until it reaches a node
//! that must suspend for user input, a terminal node, or a fault. Each call
//! is self-contained: everything that survives between calls lives in the
//! [`ExecutionState`] the caller persists.

use crate::domain::execution_state::{ExecutionState, FlowResult, SubmittedInput};
use crate::domain::flow_definition::{FlowDefinition, GraphNode, ValidatedFlow};
use crate::domain::step::{Prompts, StepCategory, StepContract, StepExecutor, START_CONDITION};
use crate::error::EngineFault;
use crate::registry::StepRegistry;
use crate::validation::{validate_flow, ValidationError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default upper bound on node visits within one advance
pub const DEFAULT_MAX_TRANSITIONS: usize = 64;

/// What a single advance produced
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// The flow suspended at a node waiting for input
    Prompts {
        /// Node the session is parked on
        node: String,
        /// Fields to collect
        prompts: Prompts,
        /// Message left by a previous step, e.g. a failed password check
        error: Option<String>,
    },

    /// The flow reached a terminal node
    Result(FlowResult),

    /// The advance aborted
    Error(EngineFault),
}

/// Executes validated flows against per-session state
#[derive(Clone, Debug)]
pub struct FlowEngine {
    registry: Arc<StepRegistry>,
    max_transitions: usize,
}

impl FlowEngine {
    /// Create an engine over a registry
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self {
            registry,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    /// Override the per-advance transition budget
    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions.max(1);
        self
    }

    /// The registry flows are validated and executed against
    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Validate a raw definition against this engine's registry
    pub fn validate_and_load(
        &self,
        definition: FlowDefinition,
    ) -> Result<ValidatedFlow, Vec<ValidationError>> {
        validate_flow(definition, &self.registry)
    }

    /// Advance a session as far as it can go without user input.
    ///
    /// `input` is applied only to the node that is current when the call
    /// starts. A call that ends in [`EngineOutcome::Error`] leaves the state
    /// as it was on entry except for `error`, so the same request can be
    /// re-issued.
    pub async fn advance(
        &self,
        flow: &ValidatedFlow,
        state: &mut ExecutionState,
        input: Option<SubmittedInput>,
    ) -> EngineOutcome {
        state.error = None;
        state.touch();

        if let Some(result) = &state.result {
            debug!(session_id = %state.session_id, flow = %flow.name(), "Session already complete");
            return EngineOutcome::Result(result.clone());
        }

        let snapshot = state.clone();
        match self.run(flow, state, input).await {
            Ok(outcome) => outcome,
            Err(fault) => {
                warn!(
                    session_id = %state.session_id,
                    flow = %flow.name(),
                    node = %state.current,
                    error = %fault,
                    "Flow advance aborted"
                );
                let message = match &fault {
                    EngineFault::StepFailed { source, .. } => source.to_string(),
                    other => other.public_message().to_string(),
                };
                *state = snapshot;
                state.error = Some(message);
                EngineOutcome::Error(fault)
            }
        }
    }

    async fn run(
        &self,
        flow: &ValidatedFlow,
        state: &mut ExecutionState,
        input: Option<SubmittedInput>,
    ) -> Result<EngineOutcome, EngineFault> {
        if state.flow_name != flow.name() {
            return Err(EngineFault::FlowMismatch {
                expected: state.flow_name.clone(),
                actual: flow.name().to_string(),
            });
        }

        let mut pending = input;
        let mut visits = 0usize;

        loop {
            visits += 1;
            if visits > self.max_transitions {
                return Err(EngineFault::TransitionLimitExceeded {
                    flow: flow.name().to_string(),
                    limit: self.max_transitions,
                });
            }

            let node = flow
                .node(&state.current)
                .ok_or_else(|| EngineFault::UnknownNode {
                    flow: flow.name().to_string(),
                    node: state.current.clone(),
                })?;
            let step = self
                .registry
                .lookup(&node.step_type)
                .ok_or_else(|| EngineFault::UnknownStepType {
                    node: node.name.clone(),
                    step_type: node.step_type.clone(),
                })?;
            let contract = step.contract();
            let submitted = pending.take();

            debug!(
                session_id = %state.session_id,
                node = %node.name,
                step_type = %node.step_type,
                category = %contract.category,
                has_input = submitted.is_some(),
                "Visiting node"
            );

            let condition = match contract.category {
                StepCategory::Entry => {
                    ignore_input(node, submitted.as_ref());
                    START_CONDITION.to_string()
                }
                StepCategory::Display => match submitted {
                    None => return suspend(step.as_ref(), state, node).await,
                    Some(input) => {
                        apply_input(contract, state, &input);
                        resolve_action(node, &input)?
                    }
                },
                StepCategory::DisplayWithLogic => match submitted {
                    None => return suspend(step.as_ref(), state, node).await,
                    Some(input) => {
                        apply_input(contract, state, &input);
                        execute(step.as_ref(), state, node).await?
                    }
                },
                StepCategory::Logic => {
                    ignore_input(node, submitted.as_ref());
                    execute(step.as_ref(), state, node).await?
                }
                StepCategory::Terminal => {
                    ignore_input(node, submitted.as_ref());
                    let result = step
                        .outcome(state, node)
                        .await
                        .map_err(|source| EngineFault::StepFailed {
                            node: node.name.clone(),
                            source,
                        })?;
                    info!(
                        session_id = %state.session_id,
                        flow = %flow.name(),
                        node = %node.name,
                        authenticated = result.authenticated,
                        auth_level = %result.auth_level,
                        "Flow completed"
                    );
                    state.result = Some(result.clone());
                    return Ok(EngineOutcome::Result(result));
                }
            };

            let target = follow(contract, node, &condition)?;
            debug!(
                session_id = %state.session_id,
                from = %node.name,
                to = %target,
                condition = %condition,
                "Transition"
            );
            state.move_to(target);
        }
    }
}

async fn suspend(
    step: &dyn StepExecutor,
    state: &mut ExecutionState,
    node: &GraphNode,
) -> Result<EngineOutcome, EngineFault> {
    let prompts = step
        .prompts(state, node)
        .await
        .map_err(|source| EngineFault::StepFailed {
            node: node.name.clone(),
            source,
        })?;
    debug!(session_id = %state.session_id, node = %node.name, "Suspended for input");
    Ok(EngineOutcome::Prompts {
        node: node.name.clone(),
        prompts,
        error: state.error.clone(),
    })
}

async fn execute(
    step: &dyn StepExecutor,
    state: &mut ExecutionState,
    node: &GraphNode,
) -> Result<String, EngineFault> {
    step.execute(state, node)
        .await
        .map_err(|source| EngineFault::StepFailed {
            node: node.name.clone(),
            source,
        })
}

/// Copy submitted fields the step declares as outputs into the context
fn apply_input(contract: &StepContract, state: &mut ExecutionState, input: &SubmittedInput) {
    for (field, value) in &input.fields {
        if contract.declares_output(field) {
            state.set(field.as_str(), value.as_str());
        } else {
            debug!(node = %state.current, field = %field, "Dropping undeclared input field");
        }
    }
}

/// Condition chosen by a Display node: the submitted action, or the only
/// transition when the node has exactly one
fn resolve_action(node: &GraphNode, input: &SubmittedInput) -> Result<String, EngineFault> {
    if let Some(action) = &input.action {
        return Ok(action.clone());
    }
    let mut labels = node.next.keys();
    match (labels.next(), labels.next()) {
        (Some(only), None) => Ok(only.clone()),
        _ => Err(EngineFault::MissingAction {
            node: node.name.clone(),
            choices: node.next.len(),
        }),
    }
}

/// Target node for a produced condition
fn follow<'a>(
    contract: &StepContract,
    node: &'a GraphNode,
    condition: &str,
) -> Result<&'a str, EngineFault> {
    if !contract.declares_condition(condition) {
        return Err(EngineFault::UndeclaredCondition {
            node: node.name.clone(),
            step_type: node.step_type.clone(),
            condition: condition.to_string(),
        });
    }
    node.next_node(condition)
        .ok_or_else(|| EngineFault::MissingTransition {
            node: node.name.clone(),
            condition: condition.to_string(),
        })
}

fn ignore_input(node: &GraphNode, input: Option<&SubmittedInput>) {
    if input.is_some() {
        debug!(node = %node.name, "Ignoring input submitted to a non-display node");
    }
}
