use async_trait::async_trait;
use authflow_core::{StepCategory, StepContract, StepExecutor, StepExecutorBase};

/// Flow entry point. Carries no behaviour; the engine follows `start`.
#[derive(Debug)]
pub struct Init {
    contract: StepContract,
}

impl Init {
    /// Registered type name
    pub const NAME: &'static str = "init";

    /// Create the step
    pub fn new() -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Entry),
        }
    }
}

impl Default for Init {
    fn default() -> Self {
        Self::new()
    }
}

impl StepExecutorBase for Init {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for Init {}
