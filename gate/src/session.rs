//! Identity-provider session model.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity provider owns sessions; the application only holds a cached,
//! time-limited copy in memory. Nothing here is persisted.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Seconds before `expires_at` at which a session is already treated as expired.
pub const EXPIRY_SKEW_SECS: u64 = 10;

/// Free-form profile fields attached to a user at sign-up.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Authenticated user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
}

impl User {
    /// Sign-in provider recorded by the platform (`"email"`, `"google"`, ...).
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.app_metadata.get("provider").and_then(Value::as_str)
    }
}

/// Session issued by the identity provider.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    /// Absolute expiry as unix seconds, when the provider reports one.
    #[serde(default)]
    pub expires_at: Option<u64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl Session {
    /// True once `now` (unix seconds) is within [`EXPIRY_SKEW_SECS`] of expiry.
    /// Sessions without an absolute expiry never report as expired.
    #[must_use]
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at
            .is_some_and(|at| now.saturating_add(EXPIRY_SKEW_SECS) >= at)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Kind of identity-provider state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Payload of a session-change notification.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    #[must_use]
    pub fn new(event: SessionEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self { event: SessionEvent::SignedOut, session: None }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
