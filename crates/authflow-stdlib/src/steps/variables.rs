use async_trait::async_trait;
use authflow_core::{
    CoreError, ExecutionState, GraphNode, StepCategory, StepContract, StepExecutor,
    StepExecutorBase,
};

/// Copies `custom_config.value` into the context under `custom_config.key`
#[derive(Debug)]
pub struct SetVariable {
    contract: StepContract,
}

impl SetVariable {
    /// Registered type name
    pub const NAME: &'static str = "setVariable";

    /// Create the step
    pub fn new() -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Logic).with_conditions(&["done"]),
        }
    }
}

impl Default for SetVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutorBase for SetVariable {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for SetVariable {
    async fn execute(
        &self,
        state: &mut ExecutionState,
        node: &GraphNode,
    ) -> Result<String, CoreError> {
        let key = node
            .config("key")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CoreError::ConfigurationError(format!(
                    "node '{}' requires custom_config 'key'",
                    node.name
                ))
            })?;
        let value = node.config("value").unwrap_or_default();

        tracing::debug!(node = %node.name, key = %key, "Setting context variable");
        state.set(key, value);
        Ok("done".to_string())
    }
}
