//! Shared HTTP client and collaborator error-body mapping.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::AuthError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build a client honoring the configured request timeout. Falls back to the
/// shared client if the builder fails.
pub fn build_client(config: &crate::config::PortalConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .unwrap_or_else(|_| shared_client().clone())
}

/// Error bodies the identity service emits: `{"error": ...}` from the auth
/// views, `{"non_field_errors": [...]}` from serializer validation, and
/// `{"detail": ...}` from the framework itself.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    non_field_errors: Option<Vec<String>>,
    detail: Option<String>,
}

/// Pull the human-readable message out of a collaborator error body.
pub fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    if let Some(message) = parsed.error {
        return Some(message);
    }
    if let Some(first) = parsed.non_field_errors.and_then(|e| e.into_iter().next()) {
        return Some(first);
    }
    parsed.detail
}

/// Map a non-success HTTP status to an error, preferring the body's message.
pub fn status_to_error(status: u16, body: &str) -> AuthError {
    let message = error_message(body).unwrap_or_else(|| body.to_string());
    match status {
        403 => AuthError::UnauthorizedRole(message),
        _ => AuthError::Api { status, message },
    }
}
