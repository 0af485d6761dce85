//! First-time TOTP enrollment: provisioning secret, QR image, first code.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::PortalConfig;
use crate::error::AuthError;
use crate::http::{build_client, error_message, status_to_error};
use crate::otp::OtpCode;
use crate::session::{Session, SessionStore, TempCredential, TokenPair};

/// Provisioning material for an authenticator app: the base32 secret and a
/// `data:image/png;base64,...` QR rendering of the provisioning URI. The
/// service discards it once the first code verifies.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentSecret {
    pub secret: String,
    pub qr_code: String,
}

/// Enrollment flow for a user with no registered device. Holds the temp
/// credential issued at login; a successful `verify` exchanges it for a full
/// session in the store.
pub struct Enrollment {
    client: reqwest::Client,
    base_url: String,
    temp: TempCredential,
    store: SessionStore,
}

impl Enrollment {
    pub fn new(config: &PortalConfig, temp: TempCredential, store: SessionStore) -> Self {
        Self {
            client: build_client(config),
            base_url: config.base_url.clone(),
            temp,
            store,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Fetch the provisioning secret and QR image. Idempotent: the service
    /// returns the same pending secret on every call, so a failed fetch is
    /// recovered by calling again.
    pub async fn begin(&self) -> Result<EnrollmentSecret, AuthError> {
        let resp = self
            .client
            .get(format!("{}/setup-2fa/", self.base_url))
            .bearer_auth(self.temp.as_str())
            .send()
            .await
            .map_err(|err| AuthError::EnrollmentUnavailable(err.to_string()))?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = error_message(&body).unwrap_or(body);
            return Err(AuthError::EnrollmentUnavailable(message));
        }
        serde_json::from_str(&body).map_err(Into::into)
    }

    /// Verify the first code from the authenticator app and establish the
    /// session. On `InvalidCode` the pending secret stays valid and the
    /// caller may retry; the service imposes no attempt limit (a known
    /// hardening gap, not a contract).
    pub async fn verify(&self, code: &OtpCode) -> Result<Session, AuthError> {
        let resp = self
            .client
            .post(format!("{}/setup-2fa/", self.base_url))
            .bearer_auth(self.temp.as_str())
            .json(&json!({ "otp_code": code.as_str() }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::BAD_REQUEST {
            let message = error_message(&body).unwrap_or_else(|| "Invalid Code".to_string());
            return Err(AuthError::InvalidCode(message));
        }
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }
        let payload: VerifyResponse = serde_json::from_str(&body)?;
        let tokens = match payload {
            VerifyResponse {
                status, tokens: Some(tokens), ..
            } if status == "SUCCESS" => tokens,
            other => {
                return Err(AuthError::InvalidResponse(format!(
                    "unexpected enrollment verification response: status {}",
                    other.status
                )))
            }
        };
        Ok(self.store.establish(tokens))
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: String,
    tokens: Option<TokenPair>,
}
