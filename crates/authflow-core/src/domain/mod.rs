/// Flow graph and deployment envelope
pub mod flow_definition;

/// Per-session execution state and results
pub mod execution_state;

/// Identity model
pub mod identity;

/// Step contracts and executor traits
pub mod step;

/// Storage interfaces
pub mod repository;
