//! Username/password authentication against the identity service.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::config::PortalConfig;
use crate::error::AuthError;
use crate::http::{build_client, error_message, status_to_error};
use crate::session::{TempCredential, TokenPair};

/// Outcome of a password login.
///
/// The step-up outcomes carry the temp credential that authorizes the
/// follow-up enrollment or challenge endpoints; the caller decides what to do
/// with it. The session store is not touched here.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Session tokens issued immediately (no step-up configured).
    Authenticated(TokenPair),
    /// No enrolled device yet; proceed to enrollment.
    SetupRequired(TempCredential),
    /// An enrolled device exists; proceed to the code/push challenge.
    ChallengeRequired(TempCredential),
}

/// Submits credentials and classifies the service's tri-state response.
pub struct Authenticator {
    client: reqwest::Client,
    base_url: String,
}

impl Authenticator {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            client: build_client(config),
            base_url: config.base_url.clone(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Submit credentials. The collaborator is authoritative; the only
    /// client-side check is that both fields are non-empty. Rejected
    /// passwords surface the service's message verbatim and the caller may
    /// resubmit freely.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "Username and password are required".to_string(),
            ));
        }
        let resp = self
            .client
            .post(format!("{}/login/", self.base_url))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let message =
                error_message(&body).unwrap_or_else(|| "Invalid credentials".to_string());
            return Err(AuthError::InvalidCredentials(message));
        }
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }

        let payload: LoginResponse = serde_json::from_str(&body)?;
        match payload.status.as_str() {
            "SUCCESS" => {
                let tokens = payload.tokens.ok_or_else(|| {
                    AuthError::InvalidResponse("login SUCCESS without tokens".to_string())
                })?;
                Ok(LoginOutcome::Authenticated(tokens))
            }
            // The service hands setup users a full token object and challenge
            // users a dedicated temp token; both only authorize step-up
            // endpoints at this point.
            "SETUP_REQUIRED" => {
                let temp = payload
                    .temp_token
                    .or(payload.tokens.map(|t| t.access))
                    .ok_or_else(|| {
                        AuthError::InvalidResponse(
                            "SETUP_REQUIRED without a usable credential".to_string(),
                        )
                    })?;
                Ok(LoginOutcome::SetupRequired(TempCredential::new(temp)))
            }
            "2FA_REQUIRED" => {
                let temp = payload.temp_token.ok_or_else(|| {
                    AuthError::InvalidResponse("2FA_REQUIRED without temp_token".to_string())
                })?;
                Ok(LoginOutcome::ChallengeRequired(TempCredential::new(temp)))
            }
            other => Err(AuthError::InvalidResponse(format!(
                "unknown login status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    status: String,
    tokens: Option<TokenPair>,
    temp_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_credentials_rejected_without_network() {
        let auth = Authenticator::new(&PortalConfig::new());
        let err = auth.login("", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        let err = auth.login("demo", "").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }
}
