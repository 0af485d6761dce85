use thiserror::Error;

/// Normalized errors for the authentication core.
///
/// Credential and code rejections carry the collaborator's message verbatim
/// so callers can surface it to the user unchanged.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    InvalidCode(String),
    #[error("Enrollment unavailable: {0}")]
    EnrollmentUnavailable(String),
    #[error("Push initiation failed: {0}")]
    PushInitiationFailed(String),
    #[error("Session expired; re-login required")]
    SessionExpired,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Unauthorized: {0}")]
    UnauthorizedRole(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;
