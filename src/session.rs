//! Token pair, session identity, and the process-wide session store.

use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair as issued by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Short-lived credential issued after password verification while step-up is
/// still pending. Authorizes only the enrollment/challenge endpoints and is
/// never stored as a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempCredential(String);

impl TempCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An established session. Identity fields are decoded (unverified) from the
/// access token's claims when it is a JWT; opaque tokens leave them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub subject: Option<String>,
    pub role: Option<String>,
    pub established_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a freshly issued token pair.
    pub fn from_tokens(tokens: TokenPair) -> Self {
        let claims = decode_claims(&tokens.access).unwrap_or_default();
        let subject = claims
            .username
            .or(claims.sub)
            .or_else(|| claims.user_id.map(|id| id.to_string()));
        Self {
            access_token: tokens.access,
            refresh_token: tokens.refresh,
            subject,
            role: claims.role,
            established_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Claims {
    sub: Option<String>,
    username: Option<String>,
    user_id: Option<i64>,
    role: Option<String>,
}

fn decode_claims(access: &str) -> Option<Claims> {
    let payload = access.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Process-wide session holder. Clones share the same underlying state.
///
/// Session mutation is a single atomic replace: readers never observe tokens
/// without the identity fields derived from them, and `clear` removes
/// everything at once.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current session wholesale.
    pub fn set(&self, session: Session) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(session);
        }
    }

    /// Build and store a session from a token pair, returning the stored copy.
    pub fn establish(&self, tokens: TokenPair) -> Session {
        let session = Session::from_tokens(tokens);
        self.set(session.clone());
        session
    }

    /// Drop the session, tokens and identity together.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.access_token.clone()))
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.refresh_token.clone()))
    }

    /// Swap in a new access token after a successful refresh. No-op when no
    /// session is present (it may have been cleared concurrently).
    pub fn replace_access_token(&self, access: impl Into<String>) {
        if let Ok(mut guard) = self.inner.write() {
            if let Some(session) = guard.as_mut() {
                session.access_token = access.into();
            }
        }
    }
}
