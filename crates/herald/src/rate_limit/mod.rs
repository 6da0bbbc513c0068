//! Issue-request rate limiting.
//!
//! Keyed by caller network identity, not by contact: one caller can exhaust
//! its allowance across every contact it targets.

mod limiter;
mod middleware;

pub use limiter::{RateLimitInfo, RateLimitPolicy, RateLimiter};
pub use middleware::limit_issue_requests;
