//! Client configuration (code > env > defaults).

use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/auth";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PUSH_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_PUSH_DENIED_DWELL: Duration = Duration::from_secs(3);
const DEFAULT_MAX_PUSH_POLLS: u32 = 150;

/// Configuration for the portal client.
///
/// `max_push_polls` bounds push-approval polling; the backend imposes no
/// limit of its own, so an unattended approval prompt would otherwise poll
/// forever.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub push_poll_interval: Duration,
    pub push_denied_dwell: Duration,
    pub max_push_polls: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PortalConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            push_poll_interval: DEFAULT_PUSH_POLL_INTERVAL,
            push_denied_dwell: DEFAULT_PUSH_DENIED_DWELL,
            max_push_polls: DEFAULT_MAX_PUSH_POLLS,
        }
    }

    /// Load from environment variables (`STEPUP_BASE_URL`,
    /// `STEPUP_TIMEOUT_SECS`, `STEPUP_PUSH_POLL_MS`, `STEPUP_PUSH_DWELL_MS`,
    /// `STEPUP_MAX_PUSH_POLLS`), reading a `.env` file if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();

        if let Ok(url) = std::env::var("STEPUP_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = env_u64("STEPUP_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_u64("STEPUP_PUSH_POLL_MS") {
            config.push_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("STEPUP_PUSH_DWELL_MS") {
            config.push_denied_dwell = Duration::from_millis(ms);
        }
        if let Some(polls) = env_u64("STEPUP_MAX_PUSH_POLLS") {
            config.max_push_polls = polls as u32;
        }
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_push_poll_interval(mut self, interval: Duration) -> Self {
        self.push_poll_interval = interval;
        self
    }

    pub fn with_push_denied_dwell(mut self, dwell: Duration) -> Self {
        self.push_denied_dwell = dwell;
        self
    }

    pub fn with_max_push_polls(mut self, max: u32) -> Self {
        self.max_push_polls = max;
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}
