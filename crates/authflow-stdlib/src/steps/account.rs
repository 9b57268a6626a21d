use super::non_empty;
use crate::credentials::hash_password;
use async_trait::async_trait;
use authflow_core::{
    context_keys, AuthLevel, CoreError, ExecutionState, GraphNode, Identity, IdentityStore,
    StepCategory, StepContract, StepExecutor, StepExecutorBase,
};
use std::sync::Arc;

const USERNAME_TAKEN: &str = "username already taken";

/// Checks whether the submitted username is still free in the realm
pub struct CheckUsernameAvailable {
    contract: StepContract,
    identities: Arc<dyn IdentityStore>,
}

impl CheckUsernameAvailable {
    /// Registered type name
    pub const NAME: &'static str = "checkUsernameAvailable";

    /// Create the step over an identity store
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Logic)
                .with_inputs(&[context_keys::USERNAME])
                .with_conditions(&["available", "taken"]),
            identities,
        }
    }
}

impl StepExecutorBase for CheckUsernameAvailable {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for CheckUsernameAvailable {
    async fn execute(
        &self,
        state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<String, CoreError> {
        let username = non_empty(state, context_keys::USERNAME)
            .ok_or_else(|| CoreError::StepExecutionError("username is required".to_string()))?
            .to_string();

        let existing = self
            .identities
            .find_by_username(&state.tenant, &state.realm, &username)
            .await?;

        if existing.is_some() {
            state.error = Some(USERNAME_TAKEN.to_string());
            return Ok("taken".to_string());
        }
        Ok("available".to_string())
    }
}

/// Registers a new identity from the submitted username and password.
///
/// The password is hashed with Argon2id and removed from the context
/// whatever the outcome.
pub struct CreateUser {
    contract: StepContract,
    identities: Arc<dyn IdentityStore>,
}

impl CreateUser {
    /// Registered type name
    pub const NAME: &'static str = "createUser";

    /// Create the step over an identity store
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Logic)
                .with_inputs(&[context_keys::USERNAME, context_keys::PASSWORD])
                .with_outputs(&[context_keys::USER_ID])
                .with_conditions(&["success", "fail"]),
            identities,
        }
    }
}

impl StepExecutorBase for CreateUser {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for CreateUser {
    async fn execute(
        &self,
        state: &mut ExecutionState,
        _node: &GraphNode,
    ) -> Result<String, CoreError> {
        let password = state.remove(context_keys::PASSWORD).unwrap_or_default();
        let username = non_empty(state, context_keys::USERNAME).map(str::to_string);

        let username = match username {
            Some(username) if !password.is_empty() => username,
            _ => {
                state.error = Some("username and password are required".to_string());
                return Ok("fail".to_string());
            }
        };

        let identity = Identity::new(&state.tenant, &state.realm, &username)
            .with_password_credential(hash_password(&password)?);

        match self.identities.create(&identity).await {
            Ok(()) => {}
            Err(CoreError::IdentityAlreadyExists(_)) => {
                state.error = Some(USERNAME_TAKEN.to_string());
                return Ok("fail".to_string());
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            tenant = %state.tenant,
            realm = %state.realm,
            user_id = %identity.id,
            "Identity registered"
        );
        state.set(context_keys::USER_ID, identity.id.clone());
        state.set(context_keys::AUTH_LEVEL, AuthLevel::FirstFactor.as_str());
        state.user = Some(identity);
        Ok("success".to_string())
    }
}
