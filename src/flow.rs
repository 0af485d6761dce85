//! Composition facade: login, step-up hand-off, and session establishment.
//!
//! The typed [`NextStep`] returned by [`AuthFlow::login`] replaces any
//! boolean "is authenticated" dispatch: a caller holding
//! `NextStep::ChallengeRequired` cannot reach an authenticated surface
//! without first completing the challenge it carries.

use crate::challenge::Challenge;
use crate::config::PortalConfig;
use crate::dispatch::Dispatcher;
use crate::enroll::Enrollment;
use crate::error::AuthError;
use crate::login::{Authenticator, LoginOutcome};
use crate::session::{Session, SessionStore};

/// What the caller must do after a password login.
pub enum NextStep {
    /// Session established; nothing further required.
    Authenticated(Session),
    /// First-time enrollment: show the QR, collect the first code.
    EnrollmentRequired(Enrollment),
    /// Step-up challenge: collect a code or initiate a push approval.
    ChallengeRequired(Challenge),
}

/// Ties the components together around one shared [`SessionStore`].
pub struct AuthFlow {
    config: PortalConfig,
    store: SessionStore,
    authenticator: Authenticator,
}

impl AuthFlow {
    pub fn new(config: PortalConfig) -> Self {
        let authenticator = Authenticator::new(&config);
        Self {
            config,
            store: SessionStore::new(),
            authenticator,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Authenticate and hand back the required next step. Step-up components
    /// share this flow's session store, so their success transitions
    /// establish the session here.
    pub async fn login(&self, username: &str, password: &str) -> Result<NextStep, AuthError> {
        match self.authenticator.login(username, password).await? {
            LoginOutcome::Authenticated(tokens) => {
                Ok(NextStep::Authenticated(self.store.establish(tokens)))
            }
            LoginOutcome::SetupRequired(temp) => Ok(NextStep::EnrollmentRequired(
                Enrollment::new(&self.config, temp, self.store.clone()),
            )),
            LoginOutcome::ChallengeRequired(temp) => Ok(NextStep::ChallengeRequired(
                Challenge::new(&self.config, temp, self.store.clone()),
            )),
        }
    }

    /// Dispatcher bound to this flow's session store.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(&self.config, self.store.clone())
    }

    pub fn logout(&self) {
        self.store.clear();
    }
}
