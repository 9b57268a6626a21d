//! Step contracts and the executor traits every step type implements.

use crate::domain::execution_state::{AuthLevel, ExecutionState, FlowResult};
use crate::domain::flow_definition::GraphNode;
use crate::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Condition label every Entry step follows
pub const START_CONDITION: &str = "start";

/// Field name to user-facing label, rendered by the caller
pub type Prompts = HashMap<String, String>;

/// How the engine drives a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepCategory {
    /// Flow entry point. Always follows `start`.
    Entry,

    /// Suspends to collect input. The submitted action picks the transition.
    Display,

    /// Suspends to collect input, then executes logic on it
    DisplayWithLogic,

    /// Executes immediately without user interaction
    Logic,

    /// Ends the flow with a result
    Terminal,
}

impl StepCategory {
    /// Whether a node of this category suspends when no input is pending
    pub fn suspends(&self) -> bool {
        matches!(self, StepCategory::Display | StepCategory::DisplayWithLogic)
    }

    /// Whether a node of this category runs step logic
    pub fn executes(&self) -> bool {
        matches!(self, StepCategory::DisplayWithLogic | StepCategory::Logic)
    }
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepCategory::Entry => "Entry",
            StepCategory::Display => "Display",
            StepCategory::DisplayWithLogic => "DisplayWithLogic",
            StepCategory::Logic => "Logic",
            StepCategory::Terminal => "Terminal",
        };
        f.write_str(name)
    }
}

/// Static declaration of what a step type reads, writes and may produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContract {
    /// Registered step type name
    pub name: String,

    /// Engine category
    pub category: StepCategory,

    /// Field names the step expects the user to submit
    pub inputs: Vec<String>,

    /// Field names the step publishes; submitted fields outside this list
    /// are dropped
    pub outputs: Vec<String>,

    /// Condition labels the step may produce
    pub conditions: Vec<String>,
}

impl StepContract {
    /// Contract with no fields and no conditions. Entry contracts start
    /// out declaring [`START_CONDITION`].
    pub fn new(name: impl Into<String>, category: StepCategory) -> Self {
        let conditions = if category == StepCategory::Entry {
            vec![START_CONDITION.to_string()]
        } else {
            Vec::new()
        };
        Self {
            name: name.into(),
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            conditions,
        }
    }

    /// Declare input fields
    pub fn with_inputs(mut self, inputs: &[&str]) -> Self {
        self.inputs = inputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declare output fields
    pub fn with_outputs(mut self, outputs: &[&str]) -> Self {
        self.outputs = outputs.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Declare condition labels
    pub fn with_conditions(mut self, conditions: &[&str]) -> Self {
        self.conditions = conditions.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether `label` is a declared condition
    pub fn declares_condition(&self, label: &str) -> bool {
        self.conditions.iter().any(|c| c == label)
    }

    /// Whether `field` is a declared output
    pub fn declares_output(&self, field: &str) -> bool {
        self.outputs.iter().any(|o| o == field)
    }
}

/// Non-async base trait for step executors
pub trait StepExecutorBase: Send + Sync {
    /// The step's static contract
    fn contract(&self) -> &StepContract;

    /// Registered type name
    fn step_type(&self) -> &str {
        &self.contract().name
    }
}

/// Behaviour of a step type.
///
/// Each capability is optional; the engine only calls the ones the step's
/// category requires. Missing capabilities surface as
/// [`CoreError::UnsupportedCapability`].
#[async_trait]
pub trait StepExecutor: StepExecutorBase {
    /// Run the step's logic and return the produced condition label
    async fn execute(
        &self,
        _state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<String, CoreError> {
        Err(CoreError::UnsupportedCapability(format!(
            "step '{}' does not execute logic",
            self.step_type()
        )))
    }

    /// Produce the prompts shown while the node is suspended
    async fn prompts(
        &self,
        _state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<Prompts, CoreError> {
        Err(CoreError::UnsupportedCapability(format!(
            "step '{}' does not render prompts",
            self.step_type()
        )))
    }

    /// Produce the terminal result
    async fn outcome(
        &self,
        state: &ExecutionState,
        _node: &GraphNode,
    ) -> Result<FlowResult, CoreError> {
        Ok(default_outcome(state))
    }
}

/// Result derived from the resolved identity and the recorded auth level.
///
/// An identity without a recorded level counts as first-factor
/// authenticated.
pub fn default_outcome(state: &ExecutionState) -> FlowResult {
    match &state.user {
        Some(identity) => {
            let level = match state.auth_level() {
                AuthLevel::Unauthenticated => AuthLevel::FirstFactor,
                level => level,
            };
            FlowResult::authenticated(identity, level, &state.flow_name)
        }
        None => FlowResult::unauthenticated(&state.flow_name),
    }
}
