use super::non_empty;
use crate::credentials::{verify_against_dummy, verify_password};
use async_trait::async_trait;
use authflow_core::{
    context_keys, AuthLevel, CoreError, ExecutionState, GraphNode, IdentityStore, StepCategory,
    StepContract, StepExecutor, StepExecutorBase,
};
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "invalid username or password";
const ACCOUNT_LOCKED: &str = "account locked";
const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;

/// Verifies the submitted username and password against the identity store.
///
/// Unknown users, inactive users and wrong passwords all produce the same
/// message. Consecutive failures are counted on the identity, which is
/// locked once `max_failed_attempts` (node config, default 5) is reached.
/// A password hash is verified on every path that reaches the store, so
/// rejection time does not reveal whether the username exists. The password
/// never outlives this step in the context.
pub struct ValidateUsernamePassword {
    contract: StepContract,
    identities: Arc<dyn IdentityStore>,
}

impl ValidateUsernamePassword {
    /// Registered type name
    pub const NAME: &'static str = "validateUsernamePassword";

    /// Create the step over an identity store
    pub fn new(identities: Arc<dyn IdentityStore>) -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::Logic)
                .with_inputs(&[context_keys::USERNAME, context_keys::PASSWORD])
                .with_outputs(&[context_keys::USER_ID, context_keys::AUTH_LEVEL])
                .with_conditions(&["success", "fail", "locked"]),
            identities,
        }
    }

    fn reject(state: &mut ExecutionState, condition: &str, message: &str) -> String {
        state.error = Some(message.to_string());
        condition.to_string()
    }
}

impl StepExecutorBase for ValidateUsernamePassword {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for ValidateUsernamePassword {
    async fn execute(
        &self,
        state: &mut ExecutionState,
        node: &GraphNode,
    ) -> Result<String, CoreError> {
        let password = state.remove(context_keys::PASSWORD).unwrap_or_default();
        let username = non_empty(state, context_keys::USERNAME).map(str::to_string);
        let username = match username {
            Some(username) if !password.is_empty() => username,
            _ => return Ok(Self::reject(state, "fail", INVALID_CREDENTIALS)),
        };

        let identity = self
            .identities
            .find_by_username(&state.tenant, &state.realm, &username)
            .await?;
        let mut identity = match identity {
            Some(identity) if identity.is_active() => identity,
            _ => {
                tracing::debug!(node = %node.name, "Unknown or inactive identity");
                verify_against_dummy(&password);
                return Ok(Self::reject(state, "fail", INVALID_CREDENTIALS));
            }
        };

        if identity.password_locked {
            return Ok(Self::reject(state, "locked", ACCOUNT_LOCKED));
        }

        let Some(credential) = identity.password_credential.as_deref() else {
            verify_against_dummy(&password);
            return Ok(Self::reject(state, "fail", INVALID_CREDENTIALS));
        };

        if !verify_password(&password, credential)? {
            let max_attempts = node.config_or("max_failed_attempts", DEFAULT_MAX_FAILED_ATTEMPTS);
            let locked = self
                .identities
                .record_failed_password_attempt(&state.tenant, &state.realm, &username, max_attempts)
                .await?
                .is_some_and(|updated| updated.password_locked);

            if locked {
                tracing::warn!(
                    tenant = %state.tenant,
                    realm = %state.realm,
                    user_id = %identity.id,
                    "Password locked after repeated failures"
                );
                return Ok(Self::reject(state, "locked", ACCOUNT_LOCKED));
            }
            return Ok(Self::reject(state, "fail", INVALID_CREDENTIALS));
        }

        identity.record_successful_login();
        self.identities.update(&identity).await?;

        let level = state.auth_level().max(AuthLevel::FirstFactor);
        state.set(context_keys::USER_ID, identity.id.clone());
        state.set(context_keys::AUTH_LEVEL, level.as_str());
        state.user = Some(identity);
        Ok("success".to_string())
    }
}
