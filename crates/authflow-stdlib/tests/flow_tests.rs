use async_trait::async_trait;
use authflow_core::{
    AuthLevel, CoreError, EngineFault, EngineOutcome, ExecutionState, FlowDefinition, FlowEngine,
    GraphNode, Identity, IdentityStore, SubmittedInput, ValidatedFlow,
};
use authflow_state_inmemory::InMemoryStateStoreProvider;
use authflow_stdlib::{
    credentials::hash_password, standard_registry, CodeSender, StdlibServices,
};
use mockall::Sequence;
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

mockall::mock! {
    Identities {}

    #[async_trait]
    impl IdentityStore for Identities {
        async fn create(&self, identity: &Identity) -> Result<(), CoreError>;
        async fn find_by_username(
            &self,
            tenant: &str,
            realm: &str,
            username: &str,
        ) -> Result<Option<Identity>, CoreError>;
        async fn find_by_id(&self, tenant: &str, realm: &str, id: &str) -> Result<Option<Identity>, CoreError>;
        async fn update(&self, identity: &Identity) -> Result<(), CoreError>;
        async fn record_failed_password_attempt(
            &self,
            tenant: &str,
            realm: &str,
            username: &str,
            max_attempts: u32,
        ) -> Result<Option<Identity>, CoreError>;
    }
}

#[derive(Default)]
struct Outbox {
    codes: Mutex<Vec<String>>,
}

impl Outbox {
    fn last(&self) -> String {
        self.codes.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CodeSender for Outbox {
    async fn send_code(&self, _identity: &Identity, code: &str) -> Result<(), CoreError> {
        self.codes.lock().unwrap().push(code.to_string());
        Ok(())
    }
}

fn engine(services: &StdlibServices) -> FlowEngine {
    FlowEngine::new(Arc::new(standard_registry(services).unwrap()))
}

fn login_definition(with_mfa: bool) -> FlowDefinition {
    let after_password = if with_mfa { "mfa" } else { "done" };
    FlowDefinition::new("login", "init")
        .with_node(GraphNode::new("init", "init").with_next("start", "credentials"))
        .with_node(
            GraphNode::new("credentials", "askUsernamePassword").with_next("submitted", "check"),
        )
        .with_node(
            GraphNode::new("check", "validateUsernamePassword")
                .with_config("max_failed_attempts", "3")
                .with_next("success", after_password)
                .with_next("fail", "credentials")
                .with_next("locked", "denied"),
        )
        .with_node(
            GraphNode::new("mfa", "oneTimeCode")
                .with_next("success", "done")
                .with_next("fail", "mfa")
                .with_next("expired", "mfa"),
        )
        .with_node(GraphNode::new("done", "successResult"))
        .with_node(GraphNode::new("denied", "failureResult"))
}

fn registration_definition() -> FlowDefinition {
    FlowDefinition::new("register", "init")
        .with_node(GraphNode::new("init", "init").with_next("start", "credentials"))
        .with_node(
            GraphNode::new("credentials", "askUsernamePassword").with_next("submitted", "available"),
        )
        .with_node(
            GraphNode::new("available", "checkUsernameAvailable")
                .with_next("available", "create")
                .with_next("taken", "credentials"),
        )
        .with_node(
            GraphNode::new("create", "createUser")
                .with_next("success", "done")
                .with_next("fail", "credentials"),
        )
        .with_node(GraphNode::new("done", "successResult"))
}

fn credentials(username: &str, password: &str) -> Option<SubmittedInput> {
    Some(
        SubmittedInput::new()
            .with_field("username", username)
            .with_field("password", password),
    )
}

async fn seeded_store() -> Arc<dyn IdentityStore> {
    let identities = InMemoryStateStoreProvider::new().create_repositories().0;
    let alice = Identity::new("acme", "customers", "alice")
        .with_password_credential(hash_password("s3cret").unwrap());
    identities.create(&alice).await.unwrap();
    identities
}

fn load(engine: &FlowEngine, definition: FlowDefinition) -> ValidatedFlow {
    engine.validate_and_load(definition).unwrap()
}

#[tokio::test]
async fn test_password_login() {
    let services = StdlibServices::new(seeded_store().await);
    let engine = engine(&services);
    let flow = load(&engine, login_definition(false));
    let mut state = ExecutionState::start("acme", "customers", &flow);

    let first = engine.advance(&flow, &mut state, None).await;
    match first {
        EngineOutcome::Prompts { node, prompts, error } => {
            assert_eq!(node, "credentials");
            assert!(prompts.contains_key("username"));
            assert!(prompts.contains_key("password"));
            assert_eq!(error, None);
        }
        other => panic!("expected prompts, got {:?}", other),
    }

    let second = engine
        .advance(&flow, &mut state, credentials("alice", "s3cret"))
        .await;
    match second {
        EngineOutcome::Result(result) => {
            assert!(result.authenticated);
            assert_eq!(result.username, "alice");
            assert_eq!(result.auth_level, AuthLevel::FirstFactor);
            assert_eq!(result.flow_name, "login");
        }
        other => panic!("expected result, got {:?}", other),
    }
    assert_eq!(state.get("password"), None);
    assert_eq!(state.history, vec!["init", "credentials", "check", "done"]);
}

#[tokio::test]
async fn test_wrong_password_returns_to_prompt_then_locks() {
    let services = StdlibServices::new(seeded_store().await);
    let engine = engine(&services);
    let flow = load(&engine, login_definition(false));
    let mut state = ExecutionState::start("acme", "customers", &flow);
    engine.advance(&flow, &mut state, None).await;

    for _ in 0..2 {
        let outcome = engine
            .advance(&flow, &mut state, credentials("alice", "guess"))
            .await;
        assert_eq!(
            outcome,
            EngineOutcome::Prompts {
                node: "credentials".to_string(),
                prompts: [
                    ("username".to_string(), "Username".to_string()),
                    ("password".to_string(), "Password".to_string()),
                ]
                .into_iter()
                .collect(),
                error: Some("invalid username or password".to_string()),
            }
        );
    }

    let locked = engine
        .advance(&flow, &mut state, credentials("alice", "guess"))
        .await;
    match locked {
        EngineOutcome::Result(result) => assert!(!result.authenticated),
        other => panic!("expected result, got {:?}", other),
    }
    assert_eq!(state.current, "denied");

    let stored = services
        .identity_store
        .find_by_username("acme", "customers", "alice")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_locked);
}

#[tokio::test]
async fn test_login_with_one_time_code() {
    let outbox = Arc::new(Outbox::default());
    let services = StdlibServices::new(seeded_store().await).with_code_sender(outbox.clone());
    let engine = engine(&services);
    let flow = load(&engine, login_definition(true));
    let mut state = ExecutionState::start("acme", "customers", &flow);

    engine.advance(&flow, &mut state, None).await;
    let challenge = engine
        .advance(&flow, &mut state, credentials("alice", "s3cret"))
        .await;
    match challenge {
        EngineOutcome::Prompts { node, prompts, .. } => {
            assert_eq!(node, "mfa");
            assert!(prompts.contains_key("otp"));
        }
        other => panic!("expected prompts, got {:?}", other),
    }

    let retry = engine
        .advance(
            &flow,
            &mut state,
            Some(SubmittedInput::new().with_field("otp", "000000x")),
        )
        .await;
    match retry {
        EngineOutcome::Prompts { node, error, .. } => {
            assert_eq!(node, "mfa");
            assert_eq!(error.as_deref(), Some("invalid code"));
        }
        other => panic!("expected prompts, got {:?}", other),
    }

    let code = outbox.last();
    let done = engine
        .advance(
            &flow,
            &mut state,
            Some(SubmittedInput::new().with_field("otp", code)),
        )
        .await;
    match done {
        EngineOutcome::Result(result) => {
            assert!(result.authenticated);
            assert_eq!(result.auth_level, AuthLevel::SecondFactor);
        }
        other => panic!("expected result, got {:?}", other),
    }
    assert_eq!(outbox.codes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_registration_then_duplicate() {
    let services = StdlibServices::new(InMemoryStateStoreProvider::new().create_repositories().0);
    let engine = engine(&services);
    let flow = load(&engine, registration_definition());

    let mut first = ExecutionState::start("acme", "customers", &flow);
    engine.advance(&flow, &mut first, None).await;
    let registered = engine
        .advance(&flow, &mut first, credentials("bob", "hunter2"))
        .await;
    match registered {
        EngineOutcome::Result(result) => {
            assert!(result.authenticated);
            assert_eq!(result.username, "bob");
        }
        other => panic!("expected result, got {:?}", other),
    }

    let mut second = ExecutionState::start("acme", "customers", &flow);
    engine.advance(&flow, &mut second, None).await;
    let duplicate = engine
        .advance(&flow, &mut second, credentials("bob", "other"))
        .await;
    match duplicate {
        EngineOutcome::Prompts { node, error, .. } => {
            assert_eq!(node, "credentials");
            assert_eq!(error.as_deref(), Some("username already taken"));
        }
        other => panic!("expected prompts, got {:?}", other),
    }
    assert_eq!(second.get("password"), None);
}

#[tokio::test]
async fn test_store_outage_aborts_and_retry_succeeds() {
    let mut identities = MockIdentities::new();
    let mut seq = Sequence::new();
    identities
        .expect_find_by_username()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Err(CoreError::IdentityStoreError("connection refused".to_string())));
    identities
        .expect_find_by_username()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(None));

    let services = StdlibServices::new(Arc::new(identities));
    let engine = engine(&services);
    let flow = load(&engine, login_definition(false));
    let mut state = ExecutionState::start("acme", "customers", &flow);
    engine.advance(&flow, &mut state, None).await;
    let before = state.clone();

    let aborted = engine
        .advance(&flow, &mut state, credentials("alice", "s3cret"))
        .await;
    match aborted {
        EngineOutcome::Error(EngineFault::StepFailed { node, .. }) => assert_eq!(node, "check"),
        other => panic!("expected step failure, got {:?}", other),
    }
    assert_eq!(state.current, "credentials");
    assert_eq!(state.context, before.context);
    assert_eq!(state.history, before.history);
    assert!(state.error.is_some());

    let retried = engine
        .advance(&flow, &mut state, credentials("alice", "s3cret"))
        .await;
    match retried {
        EngineOutcome::Prompts { node, error, .. } => {
            assert_eq!(node, "credentials");
            assert_eq!(error.as_deref(), Some("invalid username or password"));
        }
        other => panic!("expected prompts, got {:?}", other),
    }
}
