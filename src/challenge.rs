//! Post-enrollment login challenge: code entry, or push approval with
//! status polling.
//!
//! One cancellable polling task exists per push attempt. Cancellation is
//! one-shot and idempotent: every await point in the poll loop selects
//! against the token, so no request is issued after `cancel()` returns and a
//! response already in flight is dropped unseen.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PortalConfig;
use crate::error::AuthError;
use crate::http::{build_client, error_message, status_to_error};
use crate::otp::OtpCode;
use crate::session::{Session, SessionStore, TempCredential, TokenPair};

/// Observable state of a challenge instance. Every entry starts at
/// `AwaitingInput`; `Approved` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    AwaitingInput,
    Verifying,
    PushPending,
    /// A push request was denied; during the dwell no polling occurs and no
    /// new push can be initiated. Auto-resets to `AwaitingInput`.
    PushDenied,
    Approved,
}

/// Push request status as reported by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PushStatus {
    Pending,
    Approved,
    Denied,
}

impl PushStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A push approval request and its resolution.
///
/// Terminal states are sticky: once approved or denied, later status reports
/// are discarded, so a reordered `DENIED` can never undo an applied
/// `APPROVED`.
#[derive(Debug, Clone)]
pub struct PushAuthRequest {
    request_id: Uuid,
    status: PushStatus,
}

impl PushAuthRequest {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            status: PushStatus::Pending,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn status(&self) -> PushStatus {
        self.status
    }

    /// Apply a status report. Returns `false` when the request was already
    /// resolved and the report must be discarded.
    pub fn resolve(&mut self, status: PushStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }
}

/// Final outcome of a push polling task.
#[derive(Debug)]
pub enum PushOutcome {
    /// The user approved on their device; the session is established.
    Approved(Session),
    /// The user denied the request (reported after the dwell elapses).
    Denied,
    /// `cancel()` was called; no further polls were issued.
    Cancelled,
    /// The configured poll budget ran out before the user responded.
    TimedOut,
}

/// Handle to an in-flight push approval.
#[derive(Debug)]
pub struct PushHandle {
    request_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<PushOutcome>,
}

impl PushHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Stop polling. Idempotent. After this returns no further status poll
    /// is issued, and a response already in flight is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the polling task to finish. A panic inside the poll task is
    /// resumed on the caller, never reported as a cancellation.
    pub async fn outcome(mut self) -> PushOutcome {
        match (&mut self.task).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
                PushOutcome::Cancelled
            }
        }
    }
}

impl Drop for PushHandle {
    fn drop(&mut self) {
        // An abandoned handle must not leave a polling task running.
        self.cancel.cancel();
    }
}

/// Challenge flow for a user with an enrolled device.
pub struct Challenge {
    client: reqwest::Client,
    base_url: String,
    temp: TempCredential,
    store: SessionStore,
    poll_interval: Duration,
    denied_dwell: Duration,
    max_polls: u32,
    state: Arc<Mutex<ChallengeState>>,
}

impl Challenge {
    pub fn new(config: &PortalConfig, temp: TempCredential, store: SessionStore) -> Self {
        Self {
            client: build_client(config),
            base_url: config.base_url.clone(),
            temp,
            store,
            poll_interval: config.push_poll_interval,
            denied_dwell: config.push_denied_dwell,
            max_polls: config.max_push_polls,
            state: Arc::new(Mutex::new(ChallengeState::AwaitingInput)),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn state(&self) -> ChallengeState {
        self.state
            .lock()
            .map(|guard| *guard)
            .unwrap_or(ChallengeState::AwaitingInput)
    }

    /// Verify a six-digit code. A rejected code returns the state to
    /// `AwaitingInput`: the caller gets a fresh entry and the rejected code
    /// is never resubmitted.
    pub async fn verify_code(&self, code: &OtpCode) -> Result<Session, AuthError> {
        set_state(&self.state, ChallengeState::Verifying);
        match self.submit_code(code).await {
            Ok(session) => {
                set_state(&self.state, ChallengeState::Approved);
                Ok(session)
            }
            Err(err) => {
                set_state(&self.state, ChallengeState::AwaitingInput);
                Err(err)
            }
        }
    }

    async fn submit_code(&self, code: &OtpCode) -> Result<Session, AuthError> {
        let resp = self
            .client
            .post(format!("{}/verify-2fa/", self.base_url))
            .bearer_auth(self.temp.as_str())
            .json(&json!({ "otp_code": code.as_str() }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let message = error_message(&body).unwrap_or_else(|| "Invalid OTP".to_string());
            return Err(AuthError::InvalidCode(message));
        }
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }
        let payload: VerifyResponse = serde_json::from_str(&body)?;
        let tokens = payload.tokens.ok_or_else(|| {
            AuthError::InvalidResponse("challenge verification succeeded without tokens".to_string())
        })?;
        Ok(self.store.establish(tokens))
    }

    /// Request a push approval on the enrolled device and start polling its
    /// status. Refused while a push is pending or a denial dwell is running.
    pub async fn initiate_push(&self) -> Result<PushHandle, AuthError> {
        match self.state() {
            ChallengeState::PushPending | ChallengeState::PushDenied => {
                return Err(AuthError::PushInitiationFailed(
                    "a push request is already in progress".to_string(),
                ));
            }
            _ => {}
        }
        let resp = self
            .client
            .post(format!("{}/push-auth/initiate/", self.base_url))
            .bearer_auth(self.temp.as_str())
            .send()
            .await
            .map_err(|err| AuthError::PushInitiationFailed(err.to_string()))?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let message = error_message(&body).unwrap_or(body);
            return Err(AuthError::PushInitiationFailed(message));
        }
        let payload: InitiateResponse = serde_json::from_str(&body)?;

        set_state(&self.state, ChallengeState::PushPending);
        let cancel = CancellationToken::new();
        let poller = Poller {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            temp: self.temp.clone(),
            store: self.store.clone(),
            state: self.state.clone(),
            request: PushAuthRequest::new(payload.request_id),
            interval: self.poll_interval,
            dwell: self.denied_dwell,
            max_polls: self.max_polls,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(poller.run());
        Ok(PushHandle {
            request_id: payload.request_id,
            cancel,
            task,
        })
    }
}

struct Poller {
    client: reqwest::Client,
    base_url: String,
    temp: TempCredential,
    store: SessionStore,
    state: Arc<Mutex<ChallengeState>>,
    request: PushAuthRequest,
    interval: Duration,
    dwell: Duration,
    max_polls: u32,
    cancel: CancellationToken,
}

impl Poller {
    async fn run(mut self) -> PushOutcome {
        for _ in 0..self.max_polls {
            tokio::select! {
                _ = self.cancel.cancelled() => return self.cancelled(),
                _ = tokio::time::sleep(self.interval) => {}
            }
            // The select drops the in-flight request on cancellation, so its
            // eventual response is never observed.
            let report = tokio::select! {
                _ = self.cancel.cancelled() => return self.cancelled(),
                report = self.poll_once() => report,
            };
            let payload = match report {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(
                        request_id = %self.request.request_id(),
                        error = %err,
                        "push status poll failed; retrying on next tick"
                    );
                    continue;
                }
            };
            match payload.status {
                PushStatus::Pending => continue,
                PushStatus::Approved => {
                    let Some(tokens) = payload.tokens else {
                        tracing::warn!(
                            request_id = %self.request.request_id(),
                            "approval response missing tokens; retrying"
                        );
                        continue;
                    };
                    if !self.request.resolve(PushStatus::Approved) {
                        continue;
                    }
                    let session = self.store.establish(tokens);
                    set_state(&self.state, ChallengeState::Approved);
                    return PushOutcome::Approved(session);
                }
                PushStatus::Denied => {
                    if !self.request.resolve(PushStatus::Denied) {
                        continue;
                    }
                    set_state(&self.state, ChallengeState::PushDenied);
                    tokio::select! {
                        _ = self.cancel.cancelled() => return self.cancelled(),
                        _ = tokio::time::sleep(self.dwell) => {}
                    }
                    set_state(&self.state, ChallengeState::AwaitingInput);
                    return PushOutcome::Denied;
                }
            }
        }
        tracing::warn!(
            request_id = %self.request.request_id(),
            "push approval polling budget exhausted"
        );
        set_state(&self.state, ChallengeState::AwaitingInput);
        PushOutcome::TimedOut
    }

    fn cancelled(&self) -> PushOutcome {
        set_state(&self.state, ChallengeState::AwaitingInput);
        PushOutcome::Cancelled
    }

    async fn poll_once(&self) -> Result<StatusResponse, AuthError> {
        let resp = self
            .client
            .get(format!(
                "{}/push-auth/status/{}/",
                self.base_url,
                self.request.request_id()
            ))
            .bearer_auth(self.temp.as_str())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(Into::into)
    }
}

fn set_state(state: &Arc<Mutex<ChallengeState>>, next: ChallengeState) {
    if let Ok(mut guard) = state.lock() {
        tracing::debug!(from = ?*guard, to = ?next, "challenge state transition");
        *guard = next;
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    tokens: Option<TokenPair>,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    request_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: PushStatus,
    tokens: Option<TokenPair>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_request_starts_pending() {
        let request = PushAuthRequest::new(Uuid::new_v4());
        assert_eq!(request.status(), PushStatus::Pending);
        assert!(!request.status().is_terminal());
    }

    #[test]
    fn pending_report_leaves_request_open() {
        let mut request = PushAuthRequest::new(Uuid::new_v4());
        assert!(request.resolve(PushStatus::Pending));
        assert_eq!(request.status(), PushStatus::Pending);
        assert!(request.resolve(PushStatus::Approved));
    }

    #[test]
    fn approved_is_sticky() {
        let mut request = PushAuthRequest::new(Uuid::new_v4());
        assert!(request.resolve(PushStatus::Approved));
        assert!(!request.resolve(PushStatus::Denied));
        assert_eq!(request.status(), PushStatus::Approved);
    }

    #[test]
    fn denied_is_sticky() {
        let mut request = PushAuthRequest::new(Uuid::new_v4());
        assert!(request.resolve(PushStatus::Denied));
        assert!(!request.resolve(PushStatus::Approved));
        assert!(!request.resolve(PushStatus::Pending));
        assert_eq!(request.status(), PushStatus::Denied);
    }

    #[test]
    fn status_deserializes_from_wire_casing() {
        let status: PushStatus = serde_json::from_str(r#""PENDING""#).unwrap();
        assert_eq!(status, PushStatus::Pending);
        let status: PushStatus = serde_json::from_str(r#""APPROVED""#).unwrap();
        assert_eq!(status, PushStatus::Approved);
        let status: PushStatus = serde_json::from_str(r#""DENIED""#).unwrap();
        assert_eq!(status, PushStatus::Denied);
    }

    #[tokio::test]
    #[should_panic(expected = "poll task blew up")]
    async fn poll_task_panic_resumes_on_outcome() {
        let handle = PushHandle {
            request_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            task: tokio::spawn(async { panic!("poll task blew up") }),
        };
        handle.outcome().await;
    }

    #[tokio::test]
    async fn aborted_poll_task_reports_cancelled() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            PushOutcome::TimedOut
        });
        task.abort();
        let handle = PushHandle {
            request_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            task,
        };
        assert!(matches!(handle.outcome().await, PushOutcome::Cancelled));
    }

    #[test]
    fn challenge_enters_at_awaiting_input() {
        let challenge = Challenge::new(
            &PortalConfig::new(),
            TempCredential::new("temp"),
            SessionStore::new(),
        );
        assert_eq!(challenge.state(), ChallengeState::AwaitingInput);
    }
}
