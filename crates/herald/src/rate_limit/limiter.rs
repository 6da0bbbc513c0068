//! Sliding-window request counter keyed by caller identity.

use chrono::{DateTime, Duration, Utc};
use herald_common::OtpError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::Clock;

/// Window size and allowance
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest counted request leaves the window
    pub retry_after: Duration,
}

impl RateLimitInfo {
    pub fn into_result(self) -> Result<Self, OtpError> {
        if self.allowed {
            Ok(self)
        } else {
            Err(OtpError::RateLimited)
        }
    }
}

/// Per-identity sliding log of accepted requests
///
/// Only accepted requests are recorded, so a blocked caller gets back in as
/// soon as its oldest accepted request ages out.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            windows: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Count one request for `key` if the window has room
    pub fn check(&self, key: &str) -> RateLimitInfo {
        let now = self.clock.now();
        let window_start = now - self.policy.window;
        let limit = self.policy.max_requests;

        let mut windows = self.lock();
        let hits = windows.entry(key.to_string()).or_default();
        prune(hits, window_start);

        if hits.len() as u32 >= limit {
            let retry_after = hits
                .front()
                .map(|oldest| *oldest + self.policy.window - now)
                .unwrap_or_else(Duration::zero);

            tracing::warn!(
                caller = %key,
                limit,
                retry_after_secs = retry_after.num_seconds(),
                "Issue rate limit exceeded"
            );

            return RateLimitInfo {
                allowed: false,
                limit,
                remaining: 0,
                retry_after,
            };
        }

        hits.push_back(now);
        let oldest = hits.front().copied().unwrap_or(now);

        RateLimitInfo {
            allowed: true,
            limit,
            remaining: limit - hits.len() as u32,
            retry_after: oldest + self.policy.window - now,
        }
    }

    /// Forget identities with nothing left in their window
    pub fn sweep(&self) -> usize {
        let window_start = self.clock.now() - self.policy.window;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, hits| {
            prune(hits, window_start);
            !hits.is_empty()
        });
        before - windows.len()
    }

    /// Number of identities currently tracked
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(hits: &mut VecDeque<DateTime<Utc>>, window_start: DateTime<Utc>) {
    while hits.front().is_some_and(|t| *t <= window_start) {
        hits.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let policy = RateLimitPolicy {
            window: Duration::minutes(15),
            max_requests: 5,
        };
        (RateLimiter::new(policy, clock.clone()), clock)
    }

    #[test]
    fn test_allows_up_to_limit() {
        let (limiter, _) = limiter();

        for expected_remaining in (0..5).rev() {
            let info = limiter.check("10.0.0.1");
            assert!(info.allowed);
            assert_eq!(info.remaining, expected_remaining);
        }

        let info = limiter.check("10.0.0.1");
        assert!(!info.allowed);
        assert_eq!(info.remaining, 0);
        assert_eq!(info.into_result(), Err(OtpError::RateLimited));
    }

    #[test]
    fn test_identities_are_independent() {
        let (limiter, _) = limiter();
        for _ in 0..5 {
            limiter.check("10.0.0.1");
        }

        assert!(!limiter.check("10.0.0.1").allowed);
        assert!(limiter.check("10.0.0.2").allowed);
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = limiter();

        limiter.check("10.0.0.1");
        clock.advance(Duration::minutes(5));
        for _ in 0..4 {
            limiter.check("10.0.0.1");
        }

        let blocked = limiter.check("10.0.0.1");
        assert!(!blocked.allowed);
        assert_eq!(blocked.retry_after, Duration::minutes(10));

        // First request ages out; exactly one slot frees up
        clock.advance(Duration::minutes(10));
        assert!(limiter.check("10.0.0.1").allowed);
        assert!(!limiter.check("10.0.0.1").allowed);
    }

    #[test]
    fn test_blocked_requests_are_not_counted() {
        let (limiter, clock) = limiter();
        for _ in 0..5 {
            limiter.check("10.0.0.1");
        }
        for _ in 0..20 {
            assert!(!limiter.check("10.0.0.1").allowed);
        }

        clock.advance(Duration::minutes(15));
        let info = limiter.check("10.0.0.1");
        assert!(info.allowed);
        assert_eq!(info.remaining, 4);
    }

    #[test]
    fn test_sweep_forgets_idle_identities() {
        let (limiter, clock) = limiter();
        limiter.check("10.0.0.1");
        clock.advance(Duration::minutes(10));
        limiter.check("10.0.0.2");
        assert_eq!(limiter.tracked(), 2);

        clock.advance(Duration::minutes(6));
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked(), 1);
    }
}
