//! Shared constants for Herald components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";

/// Challenge validity (10 minutes)
pub const OTP_TTL_SECS: u64 = 600;

/// Number of digits in a generated code
pub const OTP_CODE_DIGITS: usize = 6;

/// Smallest code the generator emits (codes never start with a zero)
pub const OTP_CODE_MIN: u32 = 100_000;

/// Largest code the generator emits
pub const OTP_CODE_MAX: u32 = 999_999;

/// Upper bound on a single gateway dispatch
pub const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Issue-request rate limit window (15 minutes)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 900;

/// Maximum issue-requests per caller identity per window
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 5;

/// Upper bound for the challenge TTL and the rate-limit window (one year)
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Background sweep interval for expired challenges and idle rate-limit windows
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Brand name used in outgoing messages
pub const DEFAULT_BRAND: &str = "Herald";

/// HTTP header names
pub mod headers {
    /// Original client address when running behind a proxy
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    /// Window size in requests
    pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";

    /// Requests left in the current window
    pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
}

/// Client-facing messages
pub mod messages {
    pub const ISSUE_FIELDS_REQUIRED: &str = "Contact and method are required";
    pub const VERIFY_FIELDS_REQUIRED: &str = "Contact and OTP are required";
    pub const INVALID_METHOD: &str = "Invalid method. Use sms or email";
    pub const RATE_LIMITED: &str = "Too many OTP requests, please try again later";
    pub const NOT_FOUND: &str = "OTP not found or expired";
    pub const EXPIRED: &str = "OTP has expired";
    pub const MISMATCH: &str = "Invalid OTP";
    pub const DELIVERY_FAILED: &str = "Failed to send OTP";
    pub const VERIFIED: &str = "OTP verified successfully";
}
