//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use stepup::config::PortalConfig;
use wiremock::MockServer;

/// Build an unsigned JWT carrying portal-style claims.
pub fn jwt(username: &str, role: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        json!({ "username": username, "user_id": 1, "role": role })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.sig")
}

pub fn tokens_json(access: &str, refresh: &str) -> Value {
    json!({ "access": access, "refresh": refresh })
}

/// Config pointed at the mock server, with timings fast enough for tests.
pub fn test_config(server: &MockServer) -> PortalConfig {
    PortalConfig::new()
        .with_base_url(server.uri())
        .with_push_poll_interval(Duration::from_millis(20))
        .with_push_denied_dwell(Duration::from_millis(60))
        .with_max_push_polls(50)
}
