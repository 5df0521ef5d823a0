//! Mission Control command-line front end.
//!
//! Drives the auth gate against the hosted platform: inspect the current
//! access decision, sign in or out, walk through the Google redirect flow,
//! and run the companion helpers. Command output is JSON on stdout; logs go
//! to stderr.

mod config;
mod routes;
mod services;
mod supabase;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gate::view::{admin_navigation, client_sections, header_title, login_prompt_open};
use gate::{
    AccessSnapshot, AdminView, AuthActionError, AuthGate, ClientSection, GateHandle, GatePhase, NavEntry, ProviderError,
    SessionStore, ViewBranch,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::services::backend::{BackendApi, BackendError, ServiceKind};
use crate::supabase::auth::GoTrueClient;
use crate::supabase::rest::PostgrestDirectory;
use crate::supabase::{ClientBuildError, build_http_client};

const DEFAULT_WAIT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    HttpClient(#[from] ClientBuildError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Auth(#[from] AuthActionError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("timed out waiting for the access decision")]
    Timeout,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "mission-control", about = "Mission Control auth gate CLI")]
struct Cli {
    /// Refresh token of a previous session to restore before running the command.
    #[arg(long, env = "MISSION_CONTROL_REFRESH_TOKEN", global = true, hide_env_values = true)]
    refresh_token: Option<String>,

    /// How long to wait for the access decision to settle.
    #[arg(long, default_value_t = DEFAULT_WAIT_SECS, global = true)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current access decision and the view it selects.
    Whoami {
        /// Admin console section to open (`dashboard`, `clients`, ...); unknown ids open the dashboard.
        #[arg(long)]
        view: Option<String>,
    },
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MISSION_CONTROL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the Google consent URL.
    OauthUrl,
    /// Finish the Google flow from the address the browser was returned to.
    OauthResume { redirect_url: String },
    /// Sign out of the restored session.
    Logout,
    /// Check a companion service.
    Health {
        #[arg(value_enum)]
        service: ServiceKind,
    },
    /// Email a magic sign-in link to a practice.
    MagicLink {
        #[arg(long)]
        email: String,
        #[arg(long)]
        practice_name: String,
    },
    /// Run the OAuth return-address forwarding server.
    ServeRedirect,
}

/// Snapshot plus everything a front end derives from it.
#[derive(Serialize, Debug)]
struct AccessReport {
    #[serde(flatten)]
    snapshot: AccessSnapshot,
    view: ViewBranch,
    title: String,
    login_prompt_open: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    navigation: Vec<NavEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_view: Option<AdminView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sections: Vec<ClientSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

impl AccessReport {
    fn new(snapshot: AccessSnapshot, refresh_token: Option<String>) -> Self {
        let view = ViewBranch::select(&snapshot);
        let active_view = (view == ViewBranch::AdminConsole).then_some(AdminView::Dashboard);
        let sections = match (&view, &snapshot.client_data) {
            (ViewBranch::ClientDashboard { .. }, Some(client)) => client_sections(client),
            _ => Vec::new(),
        };
        Self {
            title: header_title(&snapshot),
            login_prompt_open: login_prompt_open(&snapshot),
            navigation: admin_navigation(&snapshot),
            active_view,
            sections,
            view,
            snapshot,
            refresh_token,
        }
    }

    /// Open a specific admin section; ignored outside the admin console.
    fn with_admin_view(mut self, id: Option<&str>) -> Self {
        if let (Some(_), Some(id)) = (self.active_view, id) {
            self.active_view = Some(AdminView::from_id(id));
        }
        self
    }
}

struct GateContext {
    auth: Arc<GoTrueClient>,
    gate: AuthGate,
    wait: Duration,
}

impl GateContext {
    async fn connect(config: &Config, refresh_token: Option<&str>, wait: Duration) -> Result<Self, CliError> {
        let platform = config.platform()?;
        let http = build_http_client(config.timeouts)?;
        let auth = Arc::new(GoTrueClient::new(http.clone(), platform));
        let directory = Arc::new(PostgrestDirectory::new(http, platform, auth.clone()));

        if let Some(token) = refresh_token {
            auth.restore_session(token).await?;
        }

        let gate = AuthGate::new(auth.clone(), directory.clone(), directory, config.gate_policy()?);
        Ok(Self { auth, gate, wait })
    }

    /// Mount the gate and wait for its first settled decision.
    async fn mount(&self) -> Result<(GateHandle, AccessSnapshot), CliError> {
        let handle = self.gate.start();
        let snapshot = self.settle(|s| s.phase.is_settled()).await?;
        Ok((handle, snapshot))
    }

    async fn settle<F>(&self, predicate: F) -> Result<AccessSnapshot, CliError>
    where
        F: FnMut(&AccessSnapshot) -> bool,
    {
        self.gate.wait_until(self.wait, predicate).await.ok_or(CliError::Timeout)
    }

    async fn refresh_token(&self) -> Option<String> {
        self.auth.get_session().await.ok().flatten().map(|s| s.refresh_token)
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let env_file = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    log_env_file(&env_file);

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let wait = Duration::from_secs(cli.wait_secs);
    let refresh_token = cli.refresh_token.as_deref();

    match cli.command {
        Command::Whoami { view } => run_whoami(&config, refresh_token, wait, view.as_deref()).await,
        Command::Login { email, password } => run_login(&config, wait, &email, &password).await,
        Command::OauthUrl => run_oauth_url(&config, wait).await,
        Command::OauthResume { redirect_url } => run_oauth_resume(&config, wait, &redirect_url).await,
        Command::Logout => run_logout(&config, refresh_token, wait).await,
        Command::Health { service } => run_health(&config, service).await,
        Command::MagicLink { email, practice_name } => run_magic_link(&config, &email, &practice_name).await,
        Command::ServeRedirect => run_serve_redirect(&config).await,
    }
}

async fn run_whoami(
    config: &Config,
    refresh_token: Option<&str>,
    wait: Duration,
    view: Option<&str>,
) -> Result<(), CliError> {
    let ctx = GateContext::connect(config, refresh_token, wait).await?;
    let (_handle, snapshot) = ctx.mount().await?;
    print_json(&AccessReport::new(snapshot, None).with_admin_view(view))
}

async fn run_login(config: &Config, wait: Duration, email: &str, password: &str) -> Result<(), CliError> {
    let ctx = GateContext::connect(config, None, wait).await?;
    let (_handle, _) = ctx.mount().await?;

    ctx.gate.sign_in(email, password).await?;
    let snapshot = ctx.settle(|s| s.phase.is_settled() && s.user.is_some()).await?;
    print_json(&AccessReport::new(snapshot, ctx.refresh_token().await))
}

async fn run_oauth_url(config: &Config, wait: Duration) -> Result<(), CliError> {
    let ctx = GateContext::connect(config, None, wait).await?;
    let redirect = ctx.gate.sign_in_with_google().await?;
    print_json(&redirect)
}

async fn run_oauth_resume(config: &Config, wait: Duration, redirect_url: &str) -> Result<(), CliError> {
    let ctx = GateContext::connect(config, None, wait).await?;
    let (_handle, _) = ctx.mount().await?;

    ctx.auth.complete_oauth_redirect(redirect_url).await?;
    let snapshot = ctx.settle(|s| s.phase.is_settled() && s.user.is_some()).await?;
    print_json(&AccessReport::new(snapshot, ctx.refresh_token().await))
}

async fn run_logout(config: &Config, refresh_token: Option<&str>, wait: Duration) -> Result<(), CliError> {
    let ctx = GateContext::connect(config, refresh_token, wait).await?;
    let (_handle, _) = ctx.mount().await?;

    ctx.gate.sign_out().await?;
    let snapshot = ctx.settle(|s| s.phase == GatePhase::Anonymous).await?;
    print_json(&AccessReport::new(snapshot, None))
}

async fn run_health(config: &Config, service: ServiceKind) -> Result<(), CliError> {
    let api = BackendApi::new(build_http_client(config.timeouts)?, config);
    let healthy = api.check_health(service).await;
    print_json(&json!({
        "service": service.as_str(),
        "url": api.base_url(service),
        "healthy": healthy,
    }))
}

async fn run_magic_link(config: &Config, email: &str, practice_name: &str) -> Result<(), CliError> {
    let api = BackendApi::new(build_http_client(config.timeouts)?, config);
    let response = api.send_magic_link(email, practice_name).await?;
    print_json(&json!({ "sent": true, "response": response }))
}

async fn run_serve_redirect(config: &Config) -> Result<(), CliError> {
    let server = config.redirect_server;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", server.listen_port)).await?;
    info!(listen_port = server.listen_port, target_port = server.target_port, "redirect helper listening");
    axum::serve(listener, routes::app(server)).await?;
    Ok(())
}

/// Report the `.env` outcome once logging is up. Returns the loaded path.
fn log_env_file(result: &Result<PathBuf, dotenvy::Error>) -> Option<&PathBuf> {
    match result {
        Ok(path) => {
            debug!(path = %path.display(), "loaded .env");
            Some(path)
        }
        Err(e) => {
            debug!(error = %e, "no .env loaded");
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
