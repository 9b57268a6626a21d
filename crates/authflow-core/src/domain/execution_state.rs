use crate::domain::flow_definition::ValidatedFlow;
use crate::domain::identity::Identity;
use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Well-known context keys shared between steps
pub mod context_keys {
    /// Submitted username
    pub const USERNAME: &str = "username";
    /// Submitted password, removed once consumed
    pub const PASSWORD: &str = "password";
    /// Id of the identity the flow resolved
    pub const USER_ID: &str = "user_id";
    /// Assurance level reached so far
    pub const AUTH_LEVEL: &str = "auth_level";
    /// Submitted one-time code
    pub const OTP: &str = "otp";
}

/// Assurance level reached by a completed flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AuthLevel {
    /// Nothing verified
    #[default]
    #[serde(rename = "0")]
    Unauthenticated,

    /// One factor verified
    #[serde(rename = "1")]
    FirstFactor,

    /// Two factors verified
    #[serde(rename = "2")]
    SecondFactor,
}

impl AuthLevel {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthLevel::Unauthenticated => "0",
            AuthLevel::FirstFactor => "1",
            AuthLevel::SecondFactor => "2",
        }
    }
}

impl fmt::Display for AuthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(AuthLevel::Unauthenticated),
            "1" => Ok(AuthLevel::FirstFactor),
            "2" => Ok(AuthLevel::SecondFactor),
            other => Err(CoreError::SerializationError(format!(
                "invalid auth level: {}",
                other
            ))),
        }
    }
}

/// Final outcome of a flow, set once a terminal node is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResult {
    /// Resolved identity id, empty when unauthenticated
    #[serde(default)]
    pub user_id: String,

    /// Resolved username, empty when unauthenticated
    #[serde(default)]
    pub username: String,

    /// Whether the flow authenticated the user
    pub authenticated: bool,

    /// Assurance level reached
    pub auth_level: AuthLevel,

    /// Flow that produced the result
    pub flow_name: String,
}

impl FlowResult {
    /// Result for an authenticated identity
    pub fn authenticated(identity: &Identity, auth_level: AuthLevel, flow_name: &str) -> Self {
        Self {
            user_id: identity.id.clone(),
            username: identity.username.clone(),
            authenticated: auth_level > AuthLevel::Unauthenticated,
            auth_level,
            flow_name: flow_name.to_string(),
        }
    }

    /// Result for a flow that ended without authenticating anyone
    pub fn unauthenticated(flow_name: &str) -> Self {
        Self {
            user_id: String::new(),
            username: String::new(),
            authenticated: false,
            auth_level: AuthLevel::Unauthenticated,
            flow_name: flow_name.to_string(),
        }
    }
}

/// Input submitted by the caller when resuming a suspended node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedInput {
    /// Chosen transition label, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Submitted field values
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

impl SubmittedInput {
    /// Empty input
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action label
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Add a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Per-session execution state.
///
/// One instance exists per in-progress authentication session. It is owned
/// exclusively by the request handling that session and survives across
/// HTTP round trips through the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Session identifier
    pub session_id: String,

    /// Owning tenant
    pub tenant: String,

    /// Owning realm
    pub realm: String,

    /// Flow this session runs
    pub flow_name: String,

    /// Name of the node the cursor is on
    pub current: String,

    /// Free-form string context shared between steps
    #[serde(default)]
    pub context: HashMap<String, String>,

    /// Identity resolved so far
    #[serde(default)]
    pub user: Option<Identity>,

    /// Terminal result, immutable once set
    #[serde(default)]
    pub result: Option<FlowResult>,

    /// Last error message for display
    #[serde(default)]
    pub error: Option<String>,

    /// Nodes the cursor has moved onto, in order
    #[serde(default)]
    pub history: Vec<String>,

    /// Session start
    pub created_at: DateTime<Utc>,

    /// Last advance
    pub updated_at: DateTime<Utc>,
}

impl ExecutionState {
    /// Fresh state positioned on the flow's entry node
    pub fn new(
        session_id: impl Into<String>,
        tenant: impl Into<String>,
        realm: impl Into<String>,
        flow: &ValidatedFlow,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            tenant: tenant.into(),
            realm: realm.into(),
            flow_name: flow.name().to_string(),
            current: flow.start().to_string(),
            context: HashMap::new(),
            user: None,
            result: None,
            error: None,
            history: vec![flow.start().to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh state with a generated session id
    pub fn start(tenant: impl Into<String>, realm: impl Into<String>, flow: &ValidatedFlow) -> Self {
        Self::new(Uuid::new_v4().to_string(), tenant, realm, flow)
    }

    /// Read a context value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    /// Read and parse a context value
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|raw| raw.parse().ok())
    }

    /// Write a context value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.context.insert(key.into(), value.into());
    }

    /// Write any displayable value
    pub fn set_display<T: fmt::Display>(&mut self, key: impl Into<String>, value: T) {
        self.context.insert(key.into(), value.to_string());
    }

    /// Remove a context value, returning it
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.context.remove(key)
    }

    /// Assurance level recorded in the context
    pub fn auth_level(&self) -> AuthLevel {
        self.get_parsed(context_keys::AUTH_LEVEL).unwrap_or_default()
    }

    /// Whether the flow reached a terminal node
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// Move the cursor and record the visit
    pub fn move_to(&mut self, node: &str) {
        self.current = node.to_string();
        self.history.push(node.to_string());
    }

    /// Bump the modification time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
