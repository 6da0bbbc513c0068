//! Application state and shared resources.

use anyhow::{Context, Result};
use chrono::Duration;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::gateway::{EmailGateway, SmsGateway, build_email_gateway, build_sms_gateway};
use crate::otp::{ChallengeIssuer, IssuerConfig, OtpStore};
use crate::rate_limit::{RateLimitPolicy, RateLimiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Pending challenges, one per contact
    pub store: Arc<OtpStore>,

    /// Code generation and delivery
    pub issuer: Arc<ChallengeIssuer>,

    /// Issue-request limiter
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Create application state with the gateways named in `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let sms = build_sms_gateway(&config.sms, http.clone())
            .context("Failed to set up SMS gateway")?;
        let email = build_email_gateway(&config.email, http)
            .context("Failed to set up email gateway")?;

        tracing::info!(
            sms = sms.provider_name(),
            email = email.provider_name(),
            "Delivery gateways ready"
        );

        Ok(Self::with_parts(config, Arc::new(SystemClock), sms, email))
    }

    /// Assemble state from explicit collaborators
    pub fn with_parts(
        config: AppConfig,
        clock: Arc<dyn Clock>,
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
    ) -> Self {
        let store = Arc::new(OtpStore::new(clock.clone()));

        let issuer = Arc::new(ChallengeIssuer::new(
            store.clone(),
            sms,
            email,
            IssuerConfig {
                ttl: Duration::seconds(config.otp.ttl_secs as i64),
                delivery_timeout: std::time::Duration::from_secs(config.otp.delivery_timeout_secs),
                brand: config.brand.clone(),
            },
        ));

        let rate_limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy {
                window: Duration::seconds(config.rate_limit.window_secs as i64),
                max_requests: config.rate_limit.max_requests,
            },
            clock,
        ));

        Self {
            config,
            store,
            issuer,
            rate_limiter,
        }
    }
}
