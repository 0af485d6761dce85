//! stepup — client SDK for bearer-token sessions with TOTP and
//! push-approval step-up authentication.
//!
//! Authenticates against an identity service, walks the user through
//! first-time TOTP enrollment or a login challenge (code entry or push
//! approval with polling), and keeps the resulting session alive across
//! access-token expiry with a single-flight refresh-and-retry discipline.
//!
//! # Quick Start
//!
//! ```no_run
//! use stepup::config::PortalConfig;
//! use stepup::flow::{AuthFlow, NextStep};
//! use stepup::otp::OtpCode;
//!
//! # async fn example() -> stepup::error::Result<()> {
//! let flow = AuthFlow::new(PortalConfig::from_env());
//! match flow.login("demo", "Demo@123").await? {
//!     NextStep::Authenticated(session) => {
//!         println!("signed in as {:?}", session.subject);
//!     }
//!     NextStep::EnrollmentRequired(enrollment) => {
//!         let provisioning = enrollment.begin().await?;
//!         println!("scan this QR: {}", provisioning.qr_code);
//!         let code: OtpCode = "123456".parse()?;
//!         enrollment.verify(&code).await?;
//!     }
//!     NextStep::ChallengeRequired(challenge) => {
//!         let push = challenge.initiate_push().await?;
//!         let outcome = push.outcome().await;
//!         println!("push outcome: {outcome:?}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod config;
pub mod devices;
pub mod dispatch;
pub mod enroll;
pub mod error;
pub mod flow;
pub mod http;
pub mod login;
pub mod otp;
pub mod prelude;
pub mod session;
