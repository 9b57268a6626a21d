//! Scripted steps shared by unit tests

use crate::domain::execution_state::ExecutionState;
use crate::domain::flow_definition::GraphNode;
use crate::domain::step::{Prompts, StepCategory, StepContract, StepExecutor, StepExecutorBase};
use crate::registry::StepRegistry;
use crate::CoreError;
use async_trait::async_trait;

pub(crate) struct ScriptedStep {
    contract: StepContract,
    condition: Result<String, CoreError>,
}

impl ScriptedStep {
    pub(crate) fn new(contract: StepContract) -> Self {
        let condition = contract
            .conditions
            .first()
            .cloned()
            .ok_or_else(|| CoreError::StepExecutionError("no condition".to_string()));
        Self {
            contract,
            condition,
        }
    }

    pub(crate) fn returning(mut self, condition: &str) -> Self {
        self.condition = Ok(condition.to_string());
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.condition = Err(CoreError::StepExecutionError(message.to_string()));
        self
    }
}

impl StepExecutorBase for ScriptedStep {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for ScriptedStep {
    async fn execute(
        &self,
        _state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<String, CoreError> {
        self.condition.clone()
    }

    async fn prompts(
        &self,
        _state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<Prompts, CoreError> {
        Ok(self
            .contract
            .inputs
            .iter()
            .map(|field| (field.clone(), field.clone()))
            .collect())
    }
}

/// `init` Entry, `ask` Display, `check` Logic, `broken` failing Logic,
/// `done` Terminal
pub(crate) fn registry() -> StepRegistry {
    let mut builder = StepRegistry::builder();
    builder
        .register(ScriptedStep::new(StepContract::new("init", StepCategory::Entry)))
        .and_then(|b| {
            b.register(ScriptedStep::new(
                StepContract::new("ask", StepCategory::Display)
                    .with_inputs(&["username"])
                    .with_outputs(&["username"])
                    .with_conditions(&["submitted"]),
            ))
        })
        .and_then(|b| {
            b.register(ScriptedStep::new(
                StepContract::new("check", StepCategory::Logic).with_conditions(&["success", "fail"]),
            ))
        })
        .and_then(|b| {
            b.register(
                ScriptedStep::new(
                    StepContract::new("broken", StepCategory::Logic).with_conditions(&["success"]),
                )
                .failing("backend unavailable"),
            )
        })
        .and_then(|b| b.register(ScriptedStep::new(StepContract::new("done", StepCategory::Terminal))))
        .expect("test registry is valid");
    builder.build()
}
