//! OAuth redirect policy.
//!
//! The redirect flow has two phases. Starting it only yields a URL; the
//! browser leaves the application, and the session arrives later through the
//! ordinary session-change notification. Nothing here holds state across that
//! navigation.

#[cfg(test)]
#[path = "redirect_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Build mode selecting the OAuth return address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    /// Mode implied by the compilation profile.
    #[must_use]
    pub fn from_build() -> Self {
        if cfg!(debug_assertions) { Self::Development } else { Self::Production }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown build mode: {other}")),
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Development => f.write_str("development"),
        }
    }
}

/// Where the identity provider sends the browser after OAuth consent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub mode: BuildMode,
    pub production_url: String,
    pub development_url: String,
}

impl RedirectPolicy {
    /// Production builds return to the public site; every other mode to the dev address.
    #[must_use]
    pub fn target(&self) -> &str {
        match self.mode {
            BuildMode::Production => &self.production_url,
            BuildMode::Development => &self.development_url,
        }
    }
}

/// Supported OAuth identity providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

impl OAuthProvider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

/// Phase-one request for a redirect-based sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
    pub redirect_to: String,
    /// Extra query parameters forwarded to the provider's consent screen.
    pub query_params: Vec<(String, String)>,
}

/// Address the browser must navigate to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OAuthRedirect {
    pub url: String,
}
