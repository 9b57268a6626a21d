use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle status of an identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    /// May authenticate
    #[default]
    Active,

    /// Disabled by an administrator
    Inactive,
}

/// A user account scoped to a tenant and realm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique identifier
    pub id: String,

    /// Owning tenant
    pub tenant: String,

    /// Owning realm
    pub realm: String,

    /// Username, unique within the realm
    pub username: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: IdentityStatus,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Encoded password hash. Never serialized into sessions or responses.
    #[serde(skip)]
    pub password_credential: Option<String>,

    /// Set once too many password attempts failed in a row
    #[serde(default)]
    pub password_locked: bool,

    /// Consecutive failed password attempts
    #[serde(default)]
    pub failed_password_attempts: u32,

    /// Free-form attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,

    /// Last successful login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Create an active identity with a fresh id
    pub fn new(
        tenant: impl Into<String>,
        realm: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.into(),
            realm: realm.into(),
            username: username.into(),
            status: IdentityStatus::Active,
            display_name: None,
            email: None,
            password_credential: None,
            password_locked: false,
            failed_password_attempts: 0,
            attributes: HashMap::new(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Attach an encoded password hash
    pub fn with_password_credential(mut self, credential: impl Into<String>) -> Self {
        self.password_credential = Some(credential.into());
        self
    }

    /// Whether the identity may authenticate at all
    pub fn is_active(&self) -> bool {
        self.status == IdentityStatus::Active
    }

    /// Record a failed password attempt, locking once `max_attempts` is
    /// reached. Returns whether the identity is now locked.
    pub fn record_failed_password_attempt(&mut self, max_attempts: u32) -> bool {
        self.failed_password_attempts = self.failed_password_attempts.saturating_add(1);
        if max_attempts > 0 && self.failed_password_attempts >= max_attempts {
            self.password_locked = true;
        }
        self.updated_at = Utc::now();
        self.password_locked
    }

    /// Reset the failure counter and stamp the login time
    pub fn record_successful_login(&mut self) {
        let now = Utc::now();
        self.failed_password_attempts = 0;
        self.last_login_at = Some(now);
        self.updated_at = now;
    }
}
