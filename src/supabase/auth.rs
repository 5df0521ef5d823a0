//! Identity service client (`/auth/v1`).
//!
//! ARCHITECTURE
//! ============
//! The current session lives in memory only. Every state change (sign-in,
//! refresh, sign-out, restore) is broadcast as a [`SessionChange`] so the gate
//! can react exactly as it does to the platform's own notifications.
//!
//! OAuth is two-phase: [`SessionStore::sign_in_with_oauth`] only builds the
//! authorize URL, and [`GoTrueClient::complete_oauth_redirect`] consumes the
//! tokens the provider appends to the return address.
//!
//! ERROR HANDLING
//! ==============
//! Failed responses become a [`ProviderError`] carrying the platform's own
//! message and HTTP status. Pure helpers (`parse_error_message`,
//! `parse_redirect_fragment`, `authorize_url`) are tested directly.

use async_trait::async_trait;
use gate::{
    OAuthRedirect, OAuthRequest, ProviderError, Session, SessionChange, SessionEvent, SessionStore, User,
};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use super::now_secs;
use crate::config::PlatformConfig;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
}

impl GoTrueClient {
    #[must_use]
    pub fn new(http: reqwest::Client, platform: &PlatformConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            http,
            base_url: format!("{}/auth/v1", platform.url),
            anon_key: platform.anon_key.clone(),
            session: RwLock::new(None),
            changes,
        }
    }

    /// Access token of the held session, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.session.read().await.as_ref().map(|s| s.access_token.clone())
    }

    /// Exchange a stored refresh token for a fresh session and announce it as
    /// the initial session.
    pub async fn restore_session(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let session = self.exchange_refresh_token(refresh_token).await?;
        info!(user_id = %session.user.id, "session restored");
        self.store(SessionEvent::InitialSession, Some(session.clone())).await;
        Ok(session)
    }

    /// Second phase of the redirect sign-in: read the tokens from the return
    /// address, fetch the user they belong to, and announce the sign-in.
    pub async fn complete_oauth_redirect(&self, redirect_url: &str) -> Result<Session, ProviderError> {
        let tokens = parse_redirect_fragment(redirect_url)?;
        let user = self.fetch_user(&tokens.access_token).await?;
        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            expires_at: tokens.expires_at,
            user,
        };
        let session = with_absolute_expiry(session, now_secs());
        info!(user_id = %session.user.id, provider = ?session.user.provider(), "oauth sign-in completed");
        self.store(SessionEvent::SignedIn, Some(session.clone())).await;
        Ok(session)
    }

    /// Refresh the held session and announce the new tokens.
    pub async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| ProviderError::new("Auth session missing!"))?;
        let session = self.exchange_refresh_token(&refresh_token).await?;
        debug!(user_id = %session.user.id, "session refreshed");
        self.store(SessionEvent::TokenRefreshed, Some(session.clone())).await;
        Ok(session)
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        self.token_grant("refresh_token", &body).await
    }

    async fn token_grant(&self, grant_type: &str, body: &serde_json::Value) -> Result<Session, ProviderError> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let text = read_success(response).await?;
        let session: Session = serde_json::from_str(&text)
            .map_err(|e| ProviderError::new(format!("invalid session response: {e}")))?;
        Ok(with_absolute_expiry(session, now_secs()))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<User, ProviderError> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let text = read_success(response).await?;
        serde_json::from_str(&text).map_err(|e| ProviderError::new(format!("invalid user response: {e}")))
    }

    async fn store(&self, event: SessionEvent, session: Option<Session>) {
        *self.session.write().await = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(SessionChange::new(event, session));
    }
}

#[async_trait]
impl SessionStore for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let current = self.session.read().await.clone();
        match current {
            Some(session) if session.is_expired(now_secs()) => match self.refresh_session().await {
                Ok(fresh) => Ok(Some(fresh)),
                Err(e) => {
                    warn!(error = %e, "session refresh failed; clearing session");
                    self.store(SessionEvent::SignedOut, None).await;
                    Err(e)
                }
            },
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let session = self.token_grant("password", &body).await?;
        info!(user_id = %session.user.id, "password sign-in accepted");
        self.store(SessionEvent::SignedIn, Some(session)).await;
        Ok(())
    }

    async fn sign_in_with_oauth(&self, request: &OAuthRequest) -> Result<OAuthRedirect, ProviderError> {
        let url = authorize_url(&self.base_url, request)?;
        Ok(OAuthRedirect { url })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let Some(token) = self.access_token().await else {
            self.store(SessionEvent::SignedOut, None).await;
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ProviderError::new(e.to_string()))?;

        let status = response.status().as_u16();
        if is_already_signed_out(status) {
            debug!(status, "session already invalid on sign-out");
        } else {
            read_success(response).await?;
        }

        self.store(SessionEvent::SignedOut, None).await;
        Ok(())
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Tokens carried in the fragment of an OAuth return address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expires_at: Option<u64>,
}

/// Parse the tokens (or the provider's error) from an OAuth return address.
///
/// The platform appends them to the fragment; the query string is checked as
/// well since some providers report errors there.
pub fn parse_redirect_fragment(redirect_url: &str) -> Result<RedirectTokens, ProviderError> {
    let url = url::Url::parse(redirect_url).map_err(|e| ProviderError::new(format!("invalid redirect url: {e}")))?;

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if let Some(fragment) = url.fragment() {
        pairs.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
    }
    let get = |key: &str| {
        pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
    };

    if let Some(description) = get("error_description") {
        return Err(ProviderError::new(description));
    }
    if let Some(error) = get("error") {
        return Err(ProviderError::new(error));
    }

    let access_token = get("access_token").ok_or_else(|| ProviderError::new("redirect url carries no access_token"))?;
    let refresh_token =
        get("refresh_token").ok_or_else(|| ProviderError::new("redirect url carries no refresh_token"))?;

    Ok(RedirectTokens {
        access_token,
        refresh_token,
        token_type: get("token_type").unwrap_or_else(|| "bearer".to_owned()),
        expires_in: get("expires_in").and_then(|v| v.parse().ok()).unwrap_or(0),
        expires_at: get("expires_at").and_then(|v| v.parse().ok()),
    })
}

/// Build the provider authorize URL for phase one of a redirect sign-in.
pub fn authorize_url(auth_base: &str, request: &OAuthRequest) -> Result<String, ProviderError> {
    let mut url = url::Url::parse(&format!("{auth_base}/authorize"))
        .map_err(|e| ProviderError::new(format!("invalid auth url: {e}")))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("provider", request.provider.as_str());
        query.append_pair("redirect_to", &request.redirect_to);
        for (key, value) in &request.query_params {
            query.append_pair(key, value);
        }
    }
    Ok(url.into())
}

/// Extract the human-readable message from an identity error body.
///
/// Checks `error_description`, `msg`, `message`, then `error`; falls back to
/// the raw body, then to the status code.
pub fn parse_error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error_description", "msg", "message", "error"] {
            if let Some(text) = value.get(key).and_then(serde_json::Value::as_str) {
                if !text.is_empty() {
                    return text.to_owned();
                }
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("request failed with status {status}") } else { trimmed.to_owned() }
}

/// Statuses that mean the session is already gone on the server.
fn is_already_signed_out(status: u16) -> bool {
    matches!(status, 401 | 403 | 404)
}

/// Fill `expires_at` from `expires_in` when the platform omitted it.
fn with_absolute_expiry(mut session: Session, now: u64) -> Session {
    if session.expires_at.is_none() && session.expires_in > 0 {
        session.expires_at = Some(now + session.expires_in);
    }
    session
}

async fn read_success(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status().as_u16();
    let text = response.text().await.map_err(|e| ProviderError::new(e.to_string()))?;
    if (200..300).contains(&status) {
        Ok(text)
    } else {
        Err(ProviderError::with_status(parse_error_message(status, &text), status))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
