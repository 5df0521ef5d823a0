//! Port-forwarding page for OAuth return addresses.
//!
//! Tokens arrive in the URL fragment, which never reaches the server, so the
//! rewrite happens in the browser: the page swaps `:<listen>` for `:<target>`
//! in `window.location.href` and navigates there.

use axum::extract::State;
use axum::response::Html;
use tracing::debug;

use crate::config::RedirectServerConfig;

/// Every path answers with the same forwarding page.
pub async fn redirect_page(State(config): State<RedirectServerConfig>, uri: axum::http::Uri) -> Html<String> {
    debug!(path = %uri.path(), target_port = config.target_port, "forwarding oauth return");
    Html(render_redirect_page(config.listen_port, config.target_port))
}

pub fn render_redirect_page(listen_port: u16, target_port: u16) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Redirecting...</title>
</head>
<body>
  <p>Redirecting to the application...</p>
  <p>If you are not redirected, <a href="http://localhost:{target_port}">click here</a>.</p>
  <script>
    window.location.replace(window.location.href.replace(':{listen_port}', ':{target_port}'));
  </script>
</body>
</html>
"#
    )
}

#[cfg(test)]
#[path = "redirect_test.rs"]
mod tests;
