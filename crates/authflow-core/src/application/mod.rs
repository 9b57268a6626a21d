/// Flow execution engine
pub mod flow_engine;

/// Flow deployment and lookup service
pub mod flow_definition_service;
