//!
//! Authflow Core - flow execution engine for the Authflow identity server
//!
//! This crate defines the authentication flow graph, the step registry and
//! its contracts, the load-time validator, and the engine that advances a
//! session through a flow one HTTP round trip at a time. Storage is reached
//! only through the traits in [`domain::repository`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - flow graphs, session state, identities and storage traits
pub mod domain;

/// Application services - the engine and flow deployment
pub mod application;

/// Step registry
pub mod registry;

/// Load-time flow validation
pub mod validation;

/// Error types
pub mod error;

#[cfg(test)]
mod test_support;

// Re-export key types
pub use error::{CoreError, EngineFault, PUBLIC_FAILURE_MESSAGE};
pub use registry::{StepRegistry, StepRegistryBuilder};
pub use validation::{error_codes, validate_flow, ValidationError};

// Re-export main API types for easy use
pub use application::flow_definition_service::FlowDefinitionService;
pub use application::flow_engine::{EngineOutcome, FlowEngine, DEFAULT_MAX_TRANSITIONS};
pub use domain::execution_state::{
    context_keys, AuthLevel, ExecutionState, FlowResult, SubmittedInput,
};
pub use domain::flow_definition::{Flow, FlowDefinition, GraphNode, ValidatedFlow};
pub use domain::identity::{Identity, IdentityStatus};
pub use domain::repository::{FlowRepository, IdentityStore, SessionStore};
pub use domain::step::{
    default_outcome, Prompts, StepCategory, StepContract, StepExecutor, StepExecutorBase,
    START_CONDITION,
};
