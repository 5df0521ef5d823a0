//! Runtime configuration parsed from environment variables.
//!
//! `.env` files are loaded by `main` before this runs. Only the hosted
//! platform settings are required, and only by commands that talk to it; the
//! redirect helper runs without them.

use std::time::Duration;

use gate::{BuildMode, GatePolicy, LookupRetryPolicy, RedirectPolicy};
use gate::retry::{DEFAULT_LOOKUP_RETRIES, DEFAULT_LOOKUP_RETRY_BASE_MS};

pub const DEFAULT_DEV_REDIRECT_URL: &str = "http://localhost:3000/";
pub const DEFAULT_BACKEND_URL: &str = "https://bowerycreative-backend.onrender.com";
pub const DEFAULT_SOCIAL_MANAGER_URL: &str = "https://bowerycreative-socialmanager.onrender.com";
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REDIRECT_LISTEN_PORT: u16 = 3000;
pub const DEFAULT_REDIRECT_TARGET_PORT: u16 = 5174;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Hosted data platform endpoint and public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectServerConfig {
    pub listen_port: u16,
    pub target_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub platform: Option<PlatformConfig>,
    pub mode: BuildMode,
    pub site_url: Option<String>,
    pub dev_redirect_url: String,
    pub backend_url: String,
    pub social_manager_url: String,
    pub timeouts: HttpTimeouts,
    pub retry: LookupRetryPolicy,
    pub redirect_server: RedirectServerConfig,
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// Platform (required by gate commands):
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `APP_MODE`: `production` or `development` (default follows the build profile)
    /// - `SITE_URL`: OAuth return address in production (required there)
    /// - `DEV_REDIRECT_URL`: OAuth return address otherwise
    /// - `BACKEND_URL`, `SOCIAL_MANAGER_URL`
    /// - `HTTP_REQUEST_TIMEOUT_SECS` (30), `HTTP_CONNECT_TIMEOUT_SECS` (10)
    /// - `LOOKUP_RETRIES` (3), `LOOKUP_RETRY_BASE_MS` (200)
    /// - `REDIRECT_LISTEN_PORT` (3000), `REDIRECT_TARGET_PORT` (5174)
    pub fn from_env() -> Result<Self, ConfigError> {
        let platform = match (env_string("SUPABASE_URL"), env_string("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(PlatformConfig { url: trim_base(&url), anon_key }),
            _ => None,
        };

        let mode = match env_string("APP_MODE") {
            Some(raw) => raw
                .parse::<BuildMode>()
                .map_err(|message| ConfigError::Invalid { key: "APP_MODE", message })?,
            None => BuildMode::from_build(),
        };

        Ok(Self {
            platform,
            mode,
            site_url: env_string("SITE_URL"),
            dev_redirect_url: env_string("DEV_REDIRECT_URL").unwrap_or_else(|| DEFAULT_DEV_REDIRECT_URL.to_owned()),
            backend_url: trim_base(&env_string("BACKEND_URL").unwrap_or_else(|| DEFAULT_BACKEND_URL.to_owned())),
            social_manager_url: trim_base(
                &env_string("SOCIAL_MANAGER_URL").unwrap_or_else(|| DEFAULT_SOCIAL_MANAGER_URL.to_owned()),
            ),
            timeouts: HttpTimeouts {
                request_secs: env_parse("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            },
            retry: LookupRetryPolicy {
                attempts: env_parse("LOOKUP_RETRIES", DEFAULT_LOOKUP_RETRIES),
                base_delay: Duration::from_millis(env_parse("LOOKUP_RETRY_BASE_MS", DEFAULT_LOOKUP_RETRY_BASE_MS)),
            },
            redirect_server: RedirectServerConfig {
                listen_port: env_parse("REDIRECT_LISTEN_PORT", DEFAULT_REDIRECT_LISTEN_PORT),
                target_port: env_parse("REDIRECT_TARGET_PORT", DEFAULT_REDIRECT_TARGET_PORT),
            },
        })
    }

    /// Platform settings, or the first missing variable.
    pub fn platform(&self) -> Result<&PlatformConfig, ConfigError> {
        if let Some(platform) = &self.platform {
            return Ok(platform);
        }
        if env_string("SUPABASE_URL").is_none() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
    }

    /// OAuth return policy. Production needs an explicit `SITE_URL`.
    pub fn redirect_policy(&self) -> Result<RedirectPolicy, ConfigError> {
        let production_url = match (self.mode, &self.site_url) {
            (_, Some(url)) => url.clone(),
            (BuildMode::Production, None) => return Err(ConfigError::Missing("SITE_URL")),
            (BuildMode::Development, None) => self.dev_redirect_url.clone(),
        };
        Ok(RedirectPolicy {
            mode: self.mode,
            production_url,
            development_url: self.dev_redirect_url.clone(),
        })
    }

    pub fn gate_policy(&self) -> Result<GatePolicy, ConfigError> {
        Ok(GatePolicy { retry: self.retry, redirect: self.redirect_policy()? })
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
