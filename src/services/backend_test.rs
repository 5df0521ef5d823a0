use std::time::Duration;

use gate::LookupRetryPolicy;

use super::*;
use crate::config::{HttpTimeouts, RedirectServerConfig};

fn config() -> Config {
    Config {
        platform: None,
        mode: gate::BuildMode::Development,
        site_url: None,
        dev_redirect_url: "http://localhost:3000/".into(),
        backend_url: "https://backend.test".into(),
        social_manager_url: "https://social.test".into(),
        timeouts: HttpTimeouts { request_secs: 1, connect_secs: 1 },
        retry: LookupRetryPolicy { attempts: 1, base_delay: Duration::from_millis(1) },
        redirect_server: RedirectServerConfig { listen_port: 3000, target_port: 5174 },
    }
}

#[test]
fn base_url_selects_service() {
    let api = BackendApi::new(reqwest::Client::new(), &config());
    assert_eq!(api.base_url(ServiceKind::Backend), "https://backend.test");
    assert_eq!(api.base_url(ServiceKind::Social), "https://social.test");
}

#[test]
fn health_url_appends_path_once() {
    assert_eq!(health_url("https://backend.test"), "https://backend.test/health");
    assert_eq!(health_url("https://backend.test/"), "https://backend.test/health");
}

#[test]
fn magic_link_body_uses_camel_case_practice_name() {
    let body = serde_json::to_value(MagicLinkRequest { email: "dr@acme.test", practice_name: "Acme Dental" }).unwrap();
    assert_eq!(body, serde_json::json!({ "email": "dr@acme.test", "practiceName": "Acme Dental" }));
}

#[test]
fn magic_link_error_message_carries_status() {
    let err = BackendError::MagicLink { status: 500, body: "boom".into() };
    assert_eq!(err.to_string(), "Failed to send magic link (status 500)");
}

#[test]
fn non_json_success_body_is_null() {
    assert_eq!(parse_json_or_empty("ok"), serde_json::Value::Null);
    assert_eq!(parse_json_or_empty(r#"{"sent":true}"#), serde_json::json!({ "sent": true }));
}

#[tokio::test]
async fn magic_link_requires_both_fields() {
    let api = BackendApi::new(reqwest::Client::new(), &config());
    let err = api.send_magic_link("  ", "Acme").await.unwrap_err();
    assert!(matches!(err, BackendError::MissingFields));
}

#[test]
fn service_names_match_cli_values() {
    assert_eq!(ServiceKind::Backend.as_str(), "backend");
    assert_eq!(ServiceKind::Social.as_str(), "social");
}
