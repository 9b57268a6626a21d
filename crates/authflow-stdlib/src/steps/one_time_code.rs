use super::non_empty;
use crate::code_sender::CodeSender;
use async_trait::async_trait;
use authflow_core::{
    context_keys, AuthLevel, CoreError, ExecutionState, GraphNode, Identity, IdentityStore,
    Prompts, StepCategory, StepContract, StepExecutor, StepExecutorBase,
};
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;

/// Context key holding the pending code
pub const PENDING_CODE: &str = "otp_code";
/// Context key holding the pending code's expiry as a unix timestamp
pub const PENDING_EXPIRES_AT: &str = "otp_expires_at";
/// Context key counting wrong guesses against the pending code
pub const PENDING_ATTEMPTS: &str = "otp_attempts";

const DEFAULT_TTL_SECONDS: i64 = 300;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const CODE_DIGITS: usize = 6;

/// Second factor by a short-lived numeric code delivered out of band.
///
/// Rendering the prompt issues a code unless an unexpired one is already
/// pending, so re-displaying the node after a typo does not resend. The
/// submitted code is checked on resume; success raises the auth level to
/// second factor. After `max_attempts` wrong guesses (default 5) the pending
/// code is discarded and the step reports `expired`, so the next prompt
/// issues a fresh code.
pub struct OneTimeCode {
    contract: StepContract,
    identities: Arc<dyn IdentityStore>,
    sender: Arc<dyn CodeSender>,
}

impl OneTimeCode {
    /// Registered type name
    pub const NAME: &'static str = "oneTimeCode";

    /// Create the step
    pub fn new(identities: Arc<dyn IdentityStore>, sender: Arc<dyn CodeSender>) -> Self {
        Self {
            contract: StepContract::new(Self::NAME, StepCategory::DisplayWithLogic)
                .with_inputs(&[context_keys::USER_ID, context_keys::USERNAME])
                .with_outputs(&[context_keys::OTP])
                .with_conditions(&["success", "fail", "expired"]),
            identities,
            sender,
        }
    }

    /// The identity the code is for: the one resolved earlier in the flow,
    /// else a lookup by `user_id` or `username`.
    async fn identity(&self, state: &ExecutionState) -> Result<Identity, CoreError> {
        if let Some(identity) = &state.user {
            return Ok(identity.clone());
        }

        let found = if let Some(id) = non_empty(state, context_keys::USER_ID) {
            self.identities.find_by_id(&state.tenant, &state.realm, id).await?
        } else if let Some(username) = non_empty(state, context_keys::USERNAME) {
            self.identities
                .find_by_username(&state.tenant, &state.realm, username)
                .await?
        } else {
            None
        };

        found.ok_or_else(|| {
            CoreError::StepExecutionError("no identity to send a one-time code to".to_string())
        })
    }

    fn pending_is_fresh(state: &ExecutionState) -> bool {
        match (
            state.get(PENDING_CODE),
            state.get_parsed::<i64>(PENDING_EXPIRES_AT),
        ) {
            (Some(_), Some(expires_at)) => Utc::now().timestamp() <= expires_at,
            _ => false,
        }
    }

    fn clear_pending(state: &mut ExecutionState) {
        state.remove(PENDING_CODE);
        state.remove(PENDING_EXPIRES_AT);
        state.remove(PENDING_ATTEMPTS);
    }

    fn generate_code() -> String {
        let value: u32 = rand::thread_rng().gen_range(0..10u32.pow(CODE_DIGITS as u32));
        format!("{:0width$}", value, width = CODE_DIGITS)
    }
}

impl StepExecutorBase for OneTimeCode {
    fn contract(&self) -> &StepContract {
        &self.contract
    }
}

#[async_trait]
impl StepExecutor for OneTimeCode {
    async fn prompts(
        &self,
        state: &mut ExecutionState,
        node: &GraphNode,
    ) -> Result<Prompts, CoreError> {
        if !Self::pending_is_fresh(state) {
            let identity = self.identity(state).await?;
            let code = Self::generate_code();
            let ttl = node.config_or("ttl_seconds", DEFAULT_TTL_SECONDS);

            self.sender.send_code(&identity, &code).await?;
            tracing::debug!(node = %node.name, user_id = %identity.id, "One-time code issued");

            state.set(PENDING_CODE, code);
            state.set_display(PENDING_EXPIRES_AT, Utc::now().timestamp() + ttl);
            state.remove(PENDING_ATTEMPTS);
        }

        let label = node.config("otp_label").unwrap_or("One-time code");
        Ok(Prompts::from([(context_keys::OTP.to_string(), label.to_string())]))
    }

    async fn execute(
        &self,
        state: &mut ExecutionState,
        node: &GraphNode,
    ) -> Result<String, CoreError> {
        let submitted = state.remove(context_keys::OTP).unwrap_or_default();

        if !Self::pending_is_fresh(state) {
            Self::clear_pending(state);
            state.error = Some("one-time code expired".to_string());
            return Ok("expired".to_string());
        }

        if state.get(PENDING_CODE) != Some(submitted.trim()) {
            let attempts = state.get_parsed::<u32>(PENDING_ATTEMPTS).unwrap_or(0) + 1;
            let max_attempts = node.config_or("max_attempts", DEFAULT_MAX_ATTEMPTS);

            if attempts >= max_attempts {
                tracing::warn!(node = %node.name, attempts, "One-time code discarded after too many attempts");
                Self::clear_pending(state);
                state.error = Some("too many invalid codes, a new code will be sent".to_string());
                return Ok("expired".to_string());
            }

            state.set_display(PENDING_ATTEMPTS, attempts);
            state.error = Some("invalid code".to_string());
            return Ok("fail".to_string());
        }

        let identity = self.identity(state).await?;
        Self::clear_pending(state);
        state.set(context_keys::USER_ID, identity.id.clone());
        state.user = Some(identity);
        state.set(context_keys::AUTH_LEVEL, AuthLevel::SecondFactor.as_str());
        Ok("success".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state;
    use authflow_state_inmemory::InMemoryStateStoreProvider;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSender {
        fn last_code(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|(_, code)| code.clone())
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CodeSender for RecordingSender {
        async fn send_code(&self, identity: &Identity, code: &str) -> Result<(), CoreError> {
            self.sent
                .lock()
                .unwrap()
                .push((identity.username.clone(), code.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        step: OneTimeCode,
        sender: Arc<RecordingSender>,
        node: GraphNode,
    }

    async fn fixture() -> Fixture {
        let identities = InMemoryStateStoreProvider::new().create_repositories().0;
        identities
            .create(&Identity::new("acme", "customers", "alice"))
            .await
            .unwrap();
        let sender = Arc::new(RecordingSender::default());
        Fixture {
            step: OneTimeCode::new(identities, sender.clone()),
            sender,
            node: GraphNode::new("mfa", OneTimeCode::NAME),
        }
    }

    fn alice_state() -> ExecutionState {
        let mut state = state();
        state.set(context_keys::USERNAME, "alice");
        state
    }

    #[tokio::test]
    async fn test_prompt_issues_and_sends_code() {
        let f = fixture().await;
        let mut state = alice_state();

        let prompts = f.step.prompts(&mut state, &f.node).await.unwrap();

        assert_eq!(prompts["otp"], "One-time code");
        let code = f.sender.last_code().unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(state.get(PENDING_CODE), Some(code.as_str()));
    }

    #[tokio::test]
    async fn test_redisplay_reuses_pending_code() {
        let f = fixture().await;
        let mut state = alice_state();

        f.step.prompts(&mut state, &f.node).await.unwrap();
        f.step.prompts(&mut state, &f.node).await.unwrap();

        assert_eq!(f.sender.count(), 1);
    }

    #[tokio::test]
    async fn test_correct_code_reaches_second_factor() {
        let f = fixture().await;
        let mut state = alice_state();
        f.step.prompts(&mut state, &f.node).await.unwrap();
        state.set(context_keys::OTP, f.sender.last_code().unwrap());

        assert_eq!(f.step.execute(&mut state, &f.node).await.unwrap(), "success");

        assert_eq!(state.auth_level(), AuthLevel::SecondFactor);
        assert_eq!(state.user.as_ref().map(|u| u.username.as_str()), Some("alice"));
        assert_eq!(state.get(PENDING_CODE), None);
        assert_eq!(state.get(context_keys::OTP), None);
    }

    #[tokio::test]
    async fn test_wrong_code_fails_and_keeps_pending() {
        let f = fixture().await;
        let mut state = alice_state();
        f.step.prompts(&mut state, &f.node).await.unwrap();
        state.set(context_keys::OTP, "not-a-code");

        assert_eq!(f.step.execute(&mut state, &f.node).await.unwrap(), "fail");

        assert_eq!(state.error.as_deref(), Some("invalid code"));
        assert!(state.get(PENDING_CODE).is_some());
        assert_eq!(state.get(PENDING_ATTEMPTS), Some("1"));
        assert_eq!(state.auth_level(), AuthLevel::Unauthenticated);
    }

    #[tokio::test]
    async fn test_repeated_wrong_codes_discard_pending_code() {
        let f = fixture().await;
        let node = GraphNode::new("mfa", OneTimeCode::NAME).with_config("max_attempts", "3");
        let mut state = alice_state();
        f.step.prompts(&mut state, &node).await.unwrap();
        let code = f.sender.last_code().unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 0..2 {
            state.set(context_keys::OTP, wrong);
            assert_eq!(f.step.execute(&mut state, &node).await.unwrap(), "fail");
            f.step.prompts(&mut state, &node).await.unwrap();
        }
        assert_eq!(f.sender.count(), 1);

        state.set(context_keys::OTP, wrong);
        assert_eq!(f.step.execute(&mut state, &node).await.unwrap(), "expired");
        assert_eq!(state.get(PENDING_CODE), None);
        assert_eq!(state.get(PENDING_ATTEMPTS), None);

        // the old code is no longer accepted, even before a new one is issued
        state.set(context_keys::OTP, code);
        assert_eq!(f.step.execute(&mut state, &node).await.unwrap(), "expired");

        f.step.prompts(&mut state, &node).await.unwrap();
        assert_eq!(f.sender.count(), 2);
        assert_eq!(state.get(PENDING_ATTEMPTS), None);
    }

    #[tokio::test]
    async fn test_expired_code() {
        let f = fixture().await;
        let mut state = alice_state();
        f.step.prompts(&mut state, &f.node).await.unwrap();
        let code = f.sender.last_code().unwrap();
        state.set_display(PENDING_EXPIRES_AT, Utc::now().timestamp() - 1);
        state.set(context_keys::OTP, code);

        assert_eq!(f.step.execute(&mut state, &f.node).await.unwrap(), "expired");

        assert_eq!(state.get(PENDING_CODE), None);
        f.step.prompts(&mut state, &f.node).await.unwrap();
        assert_eq!(f.sender.count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_identity_is_a_step_error() {
        let f = fixture().await;
        let mut state = state();
        state.set(context_keys::USERNAME, "nobody");

        let err = f.step.prompts(&mut state, &f.node).await.unwrap_err();

        assert!(matches!(err, CoreError::StepExecutionError(_)));
        assert_eq!(f.sender.count(), 0);
    }
}
