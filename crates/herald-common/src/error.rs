//! Error taxonomy for the OTP lifecycle.

use thiserror::Error;

use crate::constants::messages;

/// Every way an issue or verify request can fail
///
/// The `Display` text is what the caller sees. Details carried by
/// `DeliveryFailed` are for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// Delivery method other than sms or email
    #[error("{}", messages::INVALID_METHOD)]
    UnsupportedMethod(String),

    /// Caller exhausted its issue-request window
    #[error("{}", messages::RATE_LIMITED)]
    RateLimited,

    /// No challenge stored for the contact
    #[error("{}", messages::NOT_FOUND)]
    NotFound,

    /// Challenge found but past its expiry; it has been removed
    #[error("{}", messages::EXPIRED)]
    Expired,

    /// Supplied code does not match; the challenge is kept
    #[error("{}", messages::MISMATCH)]
    Mismatch,

    /// Gateway failed or timed out
    #[error("{}", messages::DELIVERY_FAILED)]
    DeliveryFailed(String),
}

impl OtpError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::UnsupportedMethod(_) => 400,
            Self::RateLimited => 429,
            Self::NotFound => 400,
            Self::Expired => 400,
            Self::Mismatch => 400,
            Self::DeliveryFailed(_) => 500,
        }
    }

    /// Returns true if the caller may simply try the same request again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::DeliveryFailed(_))
    }
}
