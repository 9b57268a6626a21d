use async_trait::async_trait;
use authflow_core::{
    CoreError, ExecutionState, FlowResult, GraphNode, StepCategory, StepContract, StepExecutor,
    StepExecutorBase,
};

/// Terminal node reporting whatever the flow established
#[derive(Debug)]
pub struct SuccessResult {
    contract: StepContract,
}

impl SuccessResult {
    /// Registered type name
    pub const NAME: &'static str = "successResult";

    /// Create the step
    pub fn new() -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Terminal),
        }
    }
}

impl Default for SuccessResult {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutorBase for SuccessResult {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for SuccessResult {}

/// Terminal node that never authenticates, whatever was resolved before
#[derive(Debug)]
pub struct FailureResult {
    contract: StepContract,
}

impl FailureResult {
    /// Registered type name
    pub const NAME: &'static str = "failureResult";

    /// Create the step
    pub fn new() -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Terminal),
        }
    }
}

impl Default for FailureResult {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutorBase for FailureResult {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for FailureResult {
    async fn outcome(
        &self,
        state: &ExecutionState,
        _node: &GraphNode,
    ) -> Result<FlowResult, CoreError> {
        Ok(FlowResult::unauthenticated(&state.flow_name))
    }
}
