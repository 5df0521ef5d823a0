//! Router assembly for the OAuth redirect helper.
//!
//! SYSTEM CONTEXT
//! ==============
//! The identity platform returns browsers to the address configured for OAuth
//! (the helper's port). The helper forwards them, fragment included, to the
//! port the front end actually serves on.

pub mod redirect;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::config::RedirectServerConfig;

pub fn app(config: RedirectServerConfig) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .fallback(redirect::redirect_page)
        .layer(TraceLayer::new_for_http())
        .with_state(config)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
