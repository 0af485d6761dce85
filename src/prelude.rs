//! Convenience re-exports.

pub use crate::challenge::{
    Challenge, ChallengeState, PushAuthRequest, PushHandle, PushOutcome, PushStatus,
};
pub use crate::config::PortalConfig;
pub use crate::devices::{Device, DeviceManager};
pub use crate::dispatch::{Dispatcher, TokenRefresher};
pub use crate::enroll::{Enrollment, EnrollmentSecret};
pub use crate::error::{AuthError, Result};
pub use crate::flow::{AuthFlow, NextStep};
pub use crate::login::{Authenticator, LoginOutcome};
pub use crate::otp::OtpCode;
pub use crate::session::{Session, SessionStore, TempCredential, TokenPair};
