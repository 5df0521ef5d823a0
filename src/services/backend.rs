//! Companion services: the practice backend and the social manager.
//!
//! SYSTEM CONTEXT
//! ==============
//! Both services are plain HTTP APIs outside the hosted platform. The social
//! manager issues magic sign-in links for practices; both expose `/health`.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("email and practice name are required")]
    MissingFields,
    #[error("Failed to send magic link (status {status})")]
    MagicLink { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Which companion service to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ServiceKind {
    Backend,
    Social,
}

impl ServiceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Social => "social",
        }
    }
}

#[derive(Serialize)]
struct MagicLinkRequest<'a> {
    email: &'a str,
    #[serde(rename = "practiceName")]
    practice_name: &'a str,
}

pub struct BackendApi {
    http: reqwest::Client,
    backend_url: String,
    social_manager_url: String,
}

impl BackendApi {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            backend_url: config.backend_url.clone(),
            social_manager_url: config.social_manager_url.clone(),
        }
    }

    #[must_use]
    pub fn base_url(&self, service: ServiceKind) -> &str {
        match service {
            ServiceKind::Backend => &self.backend_url,
            ServiceKind::Social => &self.social_manager_url,
        }
    }

    /// Ask the social manager to email a magic sign-in link to a practice.
    pub async fn send_magic_link(&self, email: &str, practice_name: &str) -> Result<serde_json::Value, BackendError> {
        let email = email.trim();
        let practice_name = practice_name.trim();
        if email.is_empty() || practice_name.is_empty() {
            return Err(BackendError::MissingFields);
        }

        let response = self
            .http
            .post(format!("{}/magic/generate", self.social_manager_url))
            .json(&MagicLinkRequest { email, practice_name })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        if !(200..300).contains(&status) {
            warn!(status, "magic link request rejected");
            return Err(BackendError::MagicLink { status, body });
        }

        info!(practice = practice_name, "magic link sent");
        Ok(parse_json_or_empty(&body))
    }

    /// True only when `GET {base}/health` answers 2xx.
    pub async fn check_health(&self, service: ServiceKind) -> bool {
        let url = health_url(self.base_url(service));
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, url = %url, "health check failed");
                false
            }
        }
    }
}

pub fn health_url(base: &str) -> String {
    format!("{}/health", base.trim_end_matches('/'))
}

fn parse_json_or_empty(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or(serde_json::Value::Null)
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
