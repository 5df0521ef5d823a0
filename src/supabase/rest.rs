//! Table queries (`/rest/v1`) backing the role and client lookups.
//!
//! Queries run with the signed-in user's access token so row-level security
//! applies; without a session the anon key is used. A `limit=1` query that
//! returns an empty array means "not found".

use std::sync::Arc;

use async_trait::async_trait;
use gate::{AuthorizedClient, ClientLookup, LookupError, RoleLookup, RoleRecord};
use gate::access::ADMIN_ROLE;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::auth::{GoTrueClient, parse_error_message};
use crate::config::PlatformConfig;

pub struct PostgrestDirectory {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    auth: Arc<GoTrueClient>,
}

impl PostgrestDirectory {
    #[must_use]
    pub fn new(http: reqwest::Client, platform: &PlatformConfig, auth: Arc<GoTrueClient>) -> Self {
        Self {
            http,
            base_url: format!("{}/rest/v1", platform.url),
            anon_key: platform.anon_key.clone(),
            auth,
        }
    }

    async fn first_row<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>, LookupError> {
        let bearer = self.auth.access_token().await.unwrap_or_else(|| self.anon_key.clone());

        let response = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .header("Accept", "application/json")
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(LookupError::Status { status, message: parse_error_message(status, &text) });
        }

        decode_first_row(&text)
    }
}

#[async_trait]
impl RoleLookup for PostgrestDirectory {
    async fn lookup_admin_role(&self, user_id: Uuid) -> Result<Option<RoleRecord>, LookupError> {
        let row: Option<RoleRecord> = self.first_row(&admin_role_url(&self.base_url, user_id)).await?;
        debug!(%user_id, found = row.is_some(), "admin role lookup");
        Ok(row)
    }
}

#[async_trait]
impl ClientLookup for PostgrestDirectory {
    async fn lookup_authorized_client(&self, user_id: Uuid) -> Result<Option<AuthorizedClient>, LookupError> {
        let row: Option<AuthorizedClient> = self.first_row(&authorized_client_url(&self.base_url, user_id)).await?;
        debug!(%user_id, found = row.is_some(), "authorized client lookup");
        // Inactive rows are filtered by the query; keep the guarantee if a view ignores it.
        Ok(row.filter(|c| c.is_active))
    }
}

pub fn admin_role_url(rest_base: &str, user_id: Uuid) -> String {
    format!("{rest_base}/user_roles?select=role&user_id=eq.{user_id}&role=eq.{ADMIN_ROLE}&limit=1")
}

pub fn authorized_client_url(rest_base: &str, user_id: Uuid) -> String {
    format!("{rest_base}/authorized_clients?select=*&user_id=eq.{user_id}&is_active=eq.true&limit=1")
}

/// Decode a `limit=1` result set: empty array means not found.
pub fn decode_first_row<T: DeserializeOwned>(body: &str) -> Result<Option<T>, LookupError> {
    let mut rows: Vec<T> = serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    if rows.is_empty() { Ok(None) } else { Ok(Some(rows.swap_remove(0))) }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
