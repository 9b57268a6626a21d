//! Step registry
//!
//! The registry maps step type names to their executors. It is assembled
//! once at startup through [`StepRegistryBuilder`] and is immutable
//! afterwards, so it can be shared across sessions behind an `Arc`.

use crate::domain::step::{StepContract, StepExecutor};
use crate::CoreError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Immutable lookup table of step types
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn StepExecutor>>,
}

impl StepRegistry {
    /// Start building a registry
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// Executor for a step type
    pub fn lookup(&self, step_type: &str) -> Option<&Arc<dyn StepExecutor>> {
        self.steps.get(step_type)
    }

    /// Contract for a step type
    pub fn contract(&self, step_type: &str) -> Option<&StepContract> {
        self.steps.get(step_type).map(|step| step.contract())
    }

    /// Whether a step type is registered
    pub fn contains(&self, step_type: &str) -> bool {
        self.steps.contains_key(step_type)
    }

    /// Registered step type names, sorted
    pub fn step_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered step types
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("step_types", &self.step_types())
            .finish()
    }
}

/// Builder for [`StepRegistry`]
#[derive(Default)]
pub struct StepRegistryBuilder {
    steps: HashMap<String, Arc<dyn StepExecutor>>,
}

impl StepRegistryBuilder {
    /// Register a step. Names must be unique.
    pub fn register<S>(&mut self, step: S) -> Result<&mut Self, CoreError>
    where
        S: StepExecutor + 'static,
    {
        self.register_shared(Arc::new(step))
    }

    /// Register an already shared step
    pub fn register_shared(&mut self, step: Arc<dyn StepExecutor>) -> Result<&mut Self, CoreError> {
        let name = step.contract().name.clone();
        if self.steps.contains_key(&name) {
            return Err(CoreError::ConfigurationError(format!(
                "step type '{}' is already registered",
                name
            )));
        }
        tracing::debug!(step_type = %name, category = %step.contract().category, "Registered step type");
        self.steps.insert(name, step);
        Ok(self)
    }

    /// Freeze the registry
    pub fn build(&mut self) -> StepRegistry {
        StepRegistry {
            steps: std::mem::take(&mut self.steps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::{StepCategory, StepExecutorBase};
    use async_trait::async_trait;

    struct Fixed(StepContract);

    impl StepExecutorBase for Fixed {
        fn contract(&self) -> &StepContract {
            &self.0
        }
    }

    #[async_trait]
    impl StepExecutor for Fixed {}

    #[test]
    fn test_register_and_lookup() {
        let registry = StepRegistry::builder()
            .register(Fixed(StepContract::new("init", StepCategory::Entry)))
            .unwrap()
            .register(Fixed(StepContract::new("successResult", StepCategory::Terminal)))
            .unwrap()
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("init"));
        assert_eq!(
            registry.contract("successResult").map(|c| c.category),
            Some(StepCategory::Terminal)
        );
        assert!(registry.lookup("missing").is_none());
        assert_eq!(registry.step_types(), vec!["init", "successResult"]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut builder = StepRegistry::builder();
        builder
            .register(Fixed(StepContract::new("init", StepCategory::Entry)))
            .unwrap();

        let err = builder
            .register(Fixed(StepContract::new("init", StepCategory::Entry)))
            .err()
            .unwrap();
        assert!(matches!(err, CoreError::ConfigurationError(_)));
    }
}
