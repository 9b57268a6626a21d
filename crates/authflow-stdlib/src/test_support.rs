//! Helpers shared by step unit tests

use crate::steps::{Init, SuccessResult};
use authflow_core::{validate_flow, ExecutionState, FlowDefinition, GraphNode, StepRegistry};

/// Fresh state of a trivial flow in tenant `acme`, realm `customers`
pub(crate) fn state() -> ExecutionState {
    let mut builder = StepRegistry::builder();
    builder
        .register(Init::new())
        .and_then(|b| b.register(SuccessResult::new()))
        .expect("registry");
    let registry = builder.build();

    let flow = validate_flow(
        FlowDefinition::new("test", "init")
            .with_node(GraphNode::new("init", "init").with_next("start", "done"))
            .with_node(GraphNode::new("done", "successResult")),
        &registry,
    )
    .expect("valid flow");
    ExecutionState::start("acme", "customers", &flow)
}

mockall::mock! {
    pub IdentityStore {}

    #[async_trait::async_trait]
    impl authflow_core::IdentityStore for IdentityStore {
        async fn create(&self, identity: &authflow_core::Identity) -> Result<(), authflow_core::CoreError>;
        async fn find_by_username(
            &self,
            tenant: &str,
            realm: &str,
            username: &str,
        ) -> Result<Option<authflow_core::Identity>, authflow_core::CoreError>;
        async fn find_by_id(
            &self,
            tenant: &str,
            realm: &str,
            id: &str,
        ) -> Result<Option<authflow_core::Identity>, authflow_core::CoreError>;
        async fn update(&self, identity: &authflow_core::Identity) -> Result<(), authflow_core::CoreError>;
        async fn record_failed_password_attempt(
            &self,
            tenant: &str,
            realm: &str,
            username: &str,
            max_attempts: u32,
        ) -> Result<Option<authflow_core::Identity>, authflow_core::CoreError>;
    }
}
