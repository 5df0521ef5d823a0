use super::*;
use crate::test_helpers;

// =============================================================================
// RoleRecord / AuthorizedClient
// =============================================================================

#[test]
fn role_record_admin_detection() {
    assert!(RoleRecord { role: "admin".into() }.is_admin());
    assert!(!RoleRecord { role: "editor".into() }.is_admin());
}

#[test]
fn authorized_client_deserializes_row() {
    let json = serde_json::json!({
        "id": "0b8d8f52-54d4-4d0b-9a55-0d7d7b6f3e01",
        "user_id": "6f1c2f0e-9a43-4d9e-8d1e-2b1b0e7f4a11",
        "organization_name": "Acme",
        "subscription_level": "pro",
        "subscription_features": {
            "dashboard_components": ["campaign_manager", "email_marketing"],
            "api_calls": "5,000",
            "team_members": 5,
            "custom_branding": true,
            "white_label": false
        },
        "is_active": true,
        "created_at": "2025-01-01T00:00:00Z"
    });
    let record: AuthorizedClient = serde_json::from_value(json).unwrap();
    assert_eq!(record.organization_name, "Acme");
    assert_eq!(record.subscription_level, "pro");
    assert!(record.has_feature("campaign_manager"));
    assert!(record.has_feature("email_marketing"));
    assert!(!record.has_feature("seo_analyzer"));

    let features = &record.subscription_features;
    assert_eq!(features.api_calls, Some(serde_json::json!("5,000")));
    assert_eq!(features.team_members, Some(serde_json::json!(5)));
    assert!(features.custom_branding);
    assert!(!features.priority_support);
    assert_eq!(features.extra.get("white_label"), Some(&serde_json::json!(false)));
}

#[test]
fn authorized_client_accepts_null_features() {
    let json = serde_json::json!({
        "user_id": "6f1c2f0e-9a43-4d9e-8d1e-2b1b0e7f4a11",
        "organization_name": "Acme",
        "subscription_level": "basic",
        "subscription_features": null,
        "is_active": true
    });
    let record: AuthorizedClient = serde_json::from_value(json).unwrap();
    assert_eq!(record.subscription_features, SubscriptionFeatures::default());
    assert!(!record.has_feature("campaign_manager"));
}

#[test]
fn subscription_features_accept_null_members() {
    let json = serde_json::json!({
        "dashboard_components": null,
        "custom_branding": null,
        "api_calls": null
    });
    let features: SubscriptionFeatures = serde_json::from_value(json).unwrap();
    assert!(features.dashboard_components.is_empty());
    assert!(!features.custom_branding);
    assert_eq!(features.api_calls, None);
}

#[test]
fn authorized_client_defaults_active_and_features() {
    let json = serde_json::json!({
        "user_id": "6f1c2f0e-9a43-4d9e-8d1e-2b1b0e7f4a11",
        "organization_name": "Acme",
        "subscription_level": "basic"
    });
    let record: AuthorizedClient = serde_json::from_value(json).unwrap();
    assert!(record.is_active);
    assert_eq!(record.subscription_features, SubscriptionFeatures::default());
    assert!(record.id.is_none());
}

// =============================================================================
// AccessSnapshot constructors
// =============================================================================

#[test]
fn initial_is_loading_and_unresolved() {
    let snap = AccessSnapshot::initial();
    assert!(snap.loading);
    assert_eq!(snap.phase, GatePhase::Unresolved);
    assert!(!snap.has_access);
    assert_eq!(snap, AccessSnapshot::default());
}

#[test]
fn anonymous_resets_everything() {
    let snap = AccessSnapshot::anonymous();
    assert!(!snap.loading);
    assert!(snap.user.is_none());
    assert!(!snap.is_admin && !snap.is_authorized_client && !snap.has_access);
    assert!(snap.client_data.is_none());
    assert_eq!(snap.phase, GatePhase::Anonymous);
}

#[test]
fn admin_snapshot_is_exclusive() {
    let snap = AccessSnapshot::admin(test_helpers::user("admin@x.com"));
    assert!(snap.is_admin);
    assert!(!snap.is_authorized_client);
    assert!(snap.has_access);
    assert!(snap.client_data.is_none());
}

#[test]
fn client_snapshot_carries_record() {
    let user = test_helpers::user("client@y.com");
    let record = test_helpers::client_record(user.id, "Acme", "pro", true);
    let snap = AccessSnapshot::client(user, record.clone());
    assert!(!snap.is_admin);
    assert!(snap.is_authorized_client);
    assert!(snap.has_access);
    assert_eq!(snap.client_data, Some(record));
}

#[test]
fn unauthorized_has_user_but_no_access() {
    let snap = AccessSnapshot::unauthorized(test_helpers::user("guest@z.com"));
    assert_eq!(snap.email(), Some("guest@z.com"));
    assert!(!snap.has_access);
    assert_eq!(snap.phase, GatePhase::Unauthorized);
    assert!(!snap.loading);
}

// =============================================================================
// resolving
// =============================================================================

#[test]
fn resolving_same_user_keeps_flags() {
    let user = test_helpers::user("admin@x.com");
    let previous = AccessSnapshot::admin(user.clone());
    let snap = AccessSnapshot::resolving(&previous, user);
    assert_eq!(snap.phase, GatePhase::Resolving);
    assert!(snap.is_admin);
    assert!(snap.has_access);
}

#[test]
fn resolving_new_user_drops_previous_flags() {
    let previous = AccessSnapshot::admin(test_helpers::user("admin@x.com"));
    let snap = AccessSnapshot::resolving(&previous, test_helpers::user("guest@z.com"));
    assert_eq!(snap.phase, GatePhase::Resolving);
    assert_eq!(snap.email(), Some("guest@z.com"));
    assert!(!snap.is_admin);
    assert!(!snap.has_access);
}

#[test]
fn resolving_preserves_initial_loading() {
    let snap = AccessSnapshot::resolving(&AccessSnapshot::initial(), test_helpers::user("a@b.c"));
    assert!(snap.loading);
}

#[test]
fn settled_phases() {
    assert!(!GatePhase::Unresolved.is_settled());
    assert!(!GatePhase::Resolving.is_settled());
    assert!(GatePhase::Anonymous.is_settled());
    assert!(GatePhase::Authorized.is_settled());
    assert!(GatePhase::Unauthorized.is_settled());
}

#[test]
fn degraded_is_omitted_from_json_when_absent() {
    let json = serde_json::to_value(AccessSnapshot::anonymous()).unwrap();
    assert!(json.get("degraded").is_none());
    let json = serde_json::to_value(AccessSnapshot::anonymous().with_degraded(Some("x".into()))).unwrap();
    assert_eq!(json["degraded"], "x");
}
