//! Collaborator contracts consumed by the gate.
//!
//! ARCHITECTURE
//! ============
//! The hosted platform's client library sits behind these traits. The gate
//! never sees wire formats: it gets sessions, change notifications, and
//! optional records back.

#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::access::{AuthorizedClient, RoleRecord};
use crate::redirect::{OAuthRedirect, OAuthRequest};
use crate::session::{Session, SessionChange};

/// Error reported by the identity provider. Displays the provider's message unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    /// HTTP status when the failure came from a response.
    pub status: Option<u16>,
}

impl ProviderError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status: None }
    }

    #[must_use]
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self { message: message.into(), status: Some(status) }
    }
}

/// Failure while looking up a role or client record.
///
/// Distinct from "not found", which is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("lookup transport failed: {0}")]
    Transport(String),
    #[error("lookup returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("lookup response could not be decoded: {0}")]
    Decode(String),
}

impl LookupError {
    /// Whether retrying the same lookup could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

/// Identity provider: session source and credential actions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// One-shot fetch of the current session.
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Register for session-change notifications. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    /// Verify email/password credentials. Success is reported through a notification.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError>;

    /// Start a redirect-based OAuth flow and return where to send the browser.
    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<OAuthRedirect, ProviderError>;

    /// Invalidate the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Role-assignment lookup.
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn lookup_admin_role(&self, user_id: Uuid) -> Result<Option<RoleRecord>, LookupError>;
}

/// Authorized-client lookup. Implementations return active records only.
#[async_trait]
pub trait ClientLookup: Send + Sync {
    async fn lookup_authorized_client(&self, user_id: Uuid) -> Result<Option<AuthorizedClient>, LookupError>;
}
