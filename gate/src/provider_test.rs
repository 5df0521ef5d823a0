use super::*;

#[test]
fn provider_error_displays_message_verbatim() {
    let err = ProviderError::with_status("Invalid login credentials", 400);
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert_eq!(err.status, Some(400));
}

#[test]
fn provider_error_new_has_no_status() {
    assert!(ProviderError::new("offline").status.is_none());
}

#[test]
fn transport_errors_are_transient() {
    assert!(LookupError::Transport("connection reset".into()).is_transient());
}

#[test]
fn server_and_throttle_statuses_are_transient() {
    for status in [408, 429, 500, 502, 503] {
        let err = LookupError::Status { status, message: String::new() };
        assert!(err.is_transient(), "expected transient for {status}");
    }
}

#[test]
fn client_statuses_and_decode_are_permanent() {
    for status in [400, 401, 403, 404, 406] {
        let err = LookupError::Status { status, message: String::new() };
        assert!(!err.is_transient(), "expected permanent for {status}");
    }
    assert!(!LookupError::Decode("bad json".into()).is_transient());
}

#[test]
fn lookup_error_display() {
    let err = LookupError::Status { status: 503, message: "unavailable".into() };
    let msg = err.to_string();
    assert!(msg.contains("503"));
    assert!(msg.contains("unavailable"));
}
