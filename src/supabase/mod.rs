//! Hosted data platform adapters.
//!
//! SYSTEM CONTEXT
//! ==============
//! The platform exposes an identity service under `/auth/v1` and table
//! queries under `/rest/v1`. [`auth::GoTrueClient`] implements the gate's
//! session store over the first; [`rest::PostgrestDirectory`] implements the
//! role and client lookups over the second.

pub mod auth;
pub mod rest;

use std::time::Duration;

use crate::config::HttpTimeouts;

#[derive(Debug, thiserror::Error)]
#[error("http client build failed: {0}")]
pub struct ClientBuildError(String);

/// Shared HTTP client with the configured timeouts.
pub fn build_http_client(timeouts: HttpTimeouts) -> Result<reqwest::Client, ClientBuildError> {
    reqwest::Client::builder()
        .timeout(timeouts.request())
        .connect_timeout(timeouts.connect())
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| ClientBuildError(e.to_string()))
}

/// Current UNIX time in whole seconds.
pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
