use super::*;

#[test]
fn page_rewrites_listen_port_to_target_port() {
    let page = render_redirect_page(3000, 5174);
    assert!(page.contains("window.location.href.replace(':3000', ':5174')"));
    assert!(page.contains(r#"<a href="http://localhost:5174">"#));
}

#[test]
fn page_follows_configured_ports() {
    let page = render_redirect_page(8080, 9090);
    assert!(page.contains("replace(':8080', ':9090')"));
    assert!(!page.contains("5174"));
}

#[tokio::test]
async fn handler_serves_page_for_any_path() {
    let config = RedirectServerConfig { listen_port: 3000, target_port: 5174 };
    let uri: axum::http::Uri = "/auth/callback?code=1".parse().unwrap();

    let Html(body) = redirect_page(State(config), uri).await;
    assert_eq!(body, render_redirect_page(3000, 5174));
}
