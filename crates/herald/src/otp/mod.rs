//! One-time passcode lifecycle.
//!
//! [`ChallengeIssuer`] generates a code, writes it to the [`OtpStore`], and
//! dispatches it. Verification goes straight to [`OtpStore::consume`].

mod issuer;
mod store;

pub use issuer::{ChallengeIssuer, IssuerConfig};
pub use store::OtpStore;

#[cfg(test)]
pub(crate) use issuer::tests::RecordingGateway;
