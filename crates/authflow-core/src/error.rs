use thiserror::Error;

/// Core error type for the Authflow runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Flow not found
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    /// Step execution error
    #[error("Step execution error: {0}")]
    StepExecutionError(String),

    /// Step was asked for a capability its category does not provide
    #[error("Unsupported step capability: {0}")]
    UnsupportedCapability(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An identity with the same username already exists in the realm
    #[error("Identity already exists: {0}")]
    IdentityAlreadyExists(String),

    /// Identity not found
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Identity store error
    #[error("Identity store error: {0}")]
    IdentityStoreError(String),

    /// Session store error
    #[error("Session store error: {0}")]
    SessionStoreError(String),

    /// Flow repository error
    #[error("Flow repository error: {0}")]
    FlowRepositoryError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

/// Message shown to end users whenever an advance aborts.
pub const PUBLIC_FAILURE_MESSAGE: &str = "authentication failed, please try again";

/// Fault raised by the flow engine while advancing a session.
///
/// Faults abort the current round trip. Their detail is meant for operator
/// logs; callers facing end users should render [`EngineFault::public_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineFault {
    /// The session cursor points at a node the flow does not contain
    #[error("node '{node}' does not exist in flow '{flow}'")]
    UnknownNode {
        /// Flow name
        flow: String,
        /// Missing node name
        node: String,
    },

    /// The node references a step type missing from the registry
    #[error("node '{node}' uses unregistered step type '{step_type}'")]
    UnknownStepType {
        /// Node name
        node: String,
        /// Step type name
        step_type: String,
    },

    /// A step produced a condition its contract does not declare
    #[error("step '{step_type}' at node '{node}' produced undeclared condition '{condition}'")]
    UndeclaredCondition {
        /// Node name
        node: String,
        /// Step type name
        step_type: String,
        /// Condition label
        condition: String,
    },

    /// The node has no transition for the produced condition
    #[error("node '{node}' has no transition for condition '{condition}'")]
    MissingTransition {
        /// Node name
        node: String,
        /// Condition label
        condition: String,
    },

    /// Input arrived without an action at a node with several transitions
    #[error("input for node '{node}' carries no action and the node has {choices} transitions")]
    MissingAction {
        /// Node name
        node: String,
        /// Number of outgoing transitions
        choices: usize,
    },

    /// A step capability returned an error
    #[error("step failed at node '{node}': {source}")]
    StepFailed {
        /// Node name
        node: String,
        /// Underlying step error
        source: CoreError,
    },

    /// The session belongs to a different flow than the one being advanced
    #[error("session belongs to flow '{expected}', not '{actual}'")]
    FlowMismatch {
        /// Flow recorded on the session
        expected: String,
        /// Flow passed to the engine
        actual: String,
    },

    /// One advance visited more nodes than the configured limit
    #[error("flow '{flow}' exceeded {limit} transitions in a single advance")]
    TransitionLimitExceeded {
        /// Flow name
        flow: String,
        /// Configured limit
        limit: usize,
    },
}

impl EngineFault {
    /// Generic message safe to show to end users
    pub fn public_message(&self) -> &'static str {
        PUBLIC_FAILURE_MESSAGE
    }

    /// Whether re-issuing the same request may succeed.
    ///
    /// Only step failures are transient; every other fault points at a
    /// broken flow or a misbehaving step and will repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineFault::StepFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (CoreError::FlowNotFound("login".to_string()), "Flow not found: login"),
            (CoreError::StepExecutionError("boom".to_string()), "Step execution error: boom"),
            (CoreError::UnsupportedCapability("prompts".to_string()), "Unsupported step capability: prompts"),
            (CoreError::ValidationError("invalid".to_string()), "Validation error: invalid"),
            (CoreError::IdentityAlreadyExists("alice".to_string()), "Identity already exists: alice"),
            (CoreError::IdentityNotFound("bob".to_string()), "Identity not found: bob"),
            (CoreError::IdentityStoreError("down".to_string()), "Identity store error: down"),
            (CoreError::SessionStoreError("gone".to_string()), "Session store error: gone"),
            (CoreError::FlowRepositoryError("locked".to_string()), "Flow repository error: locked"),
            (CoreError::SerializationError("ser_err".to_string()), "Serialization error: ser_err"),
            (CoreError::ConfigurationError("config_err".to_string()), "Configuration error: config_err"),
        ];

        for (error, expected_msg) in errors {
            assert_eq!(error.to_string(), expected_msg);
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let error: CoreError = json_error.into();

        match error {
            CoreError::SerializationError(msg) => {
                assert!(msg.contains("expected value"));
            }
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_fault_display_carries_detail() {
        let fault = EngineFault::StepFailed {
            node: "checkPassword".to_string(),
            source: CoreError::IdentityStoreError("connection refused".to_string()),
        };
        assert_eq!(
            fault.to_string(),
            "step failed at node 'checkPassword': Identity store error: connection refused"
        );
        assert!(fault.is_retryable());
    }

    #[test]
    fn test_fault_public_message_hides_detail() {
        let fault = EngineFault::UnknownNode {
            flow: "login".to_string(),
            node: "ghost".to_string(),
        };
        assert_eq!(fault.public_message(), PUBLIC_FAILURE_MESSAGE);
        assert!(!fault.public_message().contains("ghost"));
        assert!(!fault.is_retryable());
    }
}
