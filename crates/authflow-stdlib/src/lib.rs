//!
//! Standard library of authentication steps for Authflow
//!
//! Prompts, credential checks, registration, one-time codes and terminal
//! results, plus [`standard_registry`] wiring them to their collaborators.
//!

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod code_sender;
pub mod credentials;
pub mod steps;

#[cfg(test)]
mod test_support;

use authflow_core::{CoreError, IdentityStore, StepRegistry, StepRegistryBuilder};
use std::sync::Arc;

pub use code_sender::{CodeSender, LoggingCodeSender};
pub use steps::*;

/// External collaborators the standard steps depend on
#[derive(Clone)]
pub struct StdlibServices {
    /// Identity store used by credential and registration steps
    pub identity_store: Arc<dyn IdentityStore>,
    /// Delivery channel for one-time codes
    pub code_sender: Arc<dyn CodeSender>,
}

impl StdlibServices {
    /// Services over an identity store, delivering codes to the log
    pub fn new(identity_store: Arc<dyn IdentityStore>) -> Self {
        Self {
            identity_store,
            code_sender: Arc::new(LoggingCodeSender),
        }
    }

    /// Replace the code delivery channel
    pub fn with_code_sender(mut self, code_sender: Arc<dyn CodeSender>) -> Self {
        self.code_sender = code_sender;
        self
    }
}

/// Register every standard step type on `builder`
pub fn register_standard_steps<'a>(
    builder: &'a mut StepRegistryBuilder,
    services: &StdlibServices,
) -> Result<&'a mut StepRegistryBuilder, CoreError> {
    let identities = &services.identity_store;
    builder
        .register(Init::new())?
        .register(PromptStep::ask_username())?
        .register(PromptStep::ask_password())?
        .register(PromptStep::ask_username_password())?
        .register(SetVariable::new())?
        .register(CheckUsernameAvailable::new(identities.clone()))?
        .register(CreateUser::new(identities.clone()))?
        .register(ValidateUsernamePassword::new(identities.clone()))?
        .register(OneTimeCode::new(
            identities.clone(),
            services.code_sender.clone(),
        ))?
        .register(SuccessResult::new())?
        .register(FailureResult::new())
}

/// Registry holding exactly the standard step types
pub fn standard_registry(services: &StdlibServices) -> Result<StepRegistry, CoreError> {
    let mut builder = StepRegistry::builder();
    register_standard_steps(&mut builder, services)?;
    let registry = builder.build();
    tracing::debug!(steps = registry.len(), "Standard step registry built");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use authflow_core::StepCategory;
    use authflow_state_inmemory::InMemoryStateStoreProvider;

    fn services() -> StdlibServices {
        StdlibServices::new(InMemoryStateStoreProvider::new().create_repositories().0)
    }

    #[test]
    fn test_standard_registry_contents() {
        let registry = standard_registry(&services()).unwrap();

        assert_eq!(
            registry.step_types(),
            vec![
                "askPassword",
                "askUsername",
                "askUsernamePassword",
                "checkUsernameAvailable",
                "createUser",
                "failureResult",
                "init",
                "oneTimeCode",
                "setVariable",
                "successResult",
                "validateUsernamePassword",
            ]
        );
        assert_eq!(
            registry.contract("oneTimeCode").map(|c| c.category),
            Some(StepCategory::DisplayWithLogic)
        );
    }

    #[test]
    fn test_registering_twice_is_rejected() {
        let services = services();
        let mut builder = StepRegistry::builder();
        register_standard_steps(&mut builder, &services).unwrap();

        assert!(matches!(
            register_standard_steps(&mut builder, &services),
            Err(CoreError::ConfigurationError(_))
        ));
    }
}
