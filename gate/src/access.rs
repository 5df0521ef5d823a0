//! Authorization records and the derived access snapshot.
//!
//! DESIGN
//! ======
//! Admin and authorized-client status are mutually exclusive: an admin role
//! short-circuits the client lookup, so `is_authorized_client` stays false and
//! `client_data` stays empty for admins. `has_access` is always the OR of the
//! two flags; the constructors below are the only way flags get set.

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::session::User;

/// Role name that grants the agency-side console.
pub const ADMIN_ROLE: &str = "admin";

/// Row from the role-assignment relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub role: String,
}

impl RoleRecord {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Organization profile for a non-admin account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedClient {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub organization_name: String,
    pub subscription_level: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscription_features: SubscriptionFeatures,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AuthorizedClient {
    /// Whether the client's plan enables the dashboard component `feature`.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.subscription_features.dashboard_components.iter().any(|f| f == feature)
    }
}

/// Plan details stored as a JSON object on the client row.
///
/// Quotas are kept as raw JSON: rows carry both `"5,000"` and `5000`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionFeatures {
    #[serde(default, deserialize_with = "null_as_default")]
    pub dashboard_components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_calls: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_branding: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority_support: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubscriptionFeatures {
    #[must_use]
    pub fn with_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { dashboard_components: components.into_iter().map(Into::into).collect(), ..Self::default() }
    }
}

/// `null` columns decode like missing ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Where the gate is in its resolution cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatePhase {
    /// Mounted, first session fetch not finished.
    #[default]
    Unresolved,
    /// No session.
    Anonymous,
    /// Session present, role/client lookups in flight.
    Resolving,
    /// Session present and `has_access` is true.
    Authorized,
    /// Session present and `has_access` is false.
    Unauthorized,
}

impl GatePhase {
    /// Phases in which no lookup is pending.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Anonymous | Self::Authorized | Self::Unauthorized)
    }
}

/// Read-only view of the current access decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessSnapshot {
    pub user: Option<User>,
    pub loading: bool,
    pub phase: GatePhase,
    pub is_admin: bool,
    pub is_authorized_client: bool,
    pub has_access: bool,
    pub client_data: Option<AuthorizedClient>,
    /// Set when a lookup failed and access was denied by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl Default for AccessSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

impl AccessSnapshot {
    /// State right after mount: loading, nobody resolved yet.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            user: None,
            loading: true,
            phase: GatePhase::Unresolved,
            is_admin: false,
            is_authorized_client: false,
            has_access: false,
            client_data: None,
            degraded: None,
        }
    }

    /// No session: every derived field back to its default.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { loading: false, phase: GatePhase::Anonymous, ..Self::initial() }
    }

    /// Final state for a user holding the admin role.
    #[must_use]
    pub fn admin(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
            phase: GatePhase::Authorized,
            is_admin: true,
            is_authorized_client: false,
            has_access: true,
            client_data: None,
            degraded: None,
        }
    }

    /// Final state for a non-admin user with an active client record.
    #[must_use]
    pub fn client(user: User, record: AuthorizedClient) -> Self {
        Self {
            user: Some(user),
            loading: false,
            phase: GatePhase::Authorized,
            is_admin: false,
            is_authorized_client: true,
            has_access: true,
            client_data: Some(record),
            degraded: None,
        }
    }

    /// Final state for a signed-in user without elevated access.
    #[must_use]
    pub fn unauthorized(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
            phase: GatePhase::Unauthorized,
            ..Self::initial()
        }
    }

    /// Transitional state while lookups for `user` are in flight.
    ///
    /// Flags survive only when the same user is being re-resolved (token
    /// refresh); a different user never inherits the previous decision.
    #[must_use]
    pub fn resolving(previous: &Self, user: User) -> Self {
        let same_user = previous.user.as_ref().is_some_and(|u| u.id == user.id);
        let base = if same_user {
            previous.clone()
        } else {
            Self { loading: previous.loading, ..Self::initial() }
        };
        Self { user: Some(user), phase: GatePhase::Resolving, ..base }
    }

    /// Attach a degraded-access warning.
    #[must_use]
    pub fn with_degraded(mut self, reason: Option<String>) -> Self {
        self.degraded = reason;
        self
    }

    /// Email of the signed-in user, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.email.as_deref())
    }
}
