//! Configuration management for Herald.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

use herald_common::constants::{
    DEFAULT_BRAND, DEFAULT_LISTEN_ADDR, DELIVERY_TIMEOUT_SECS, MAX_DURATION_SECS, OTP_TTL_SECS,
    RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_SECS, SWEEP_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Name used in outgoing SMS and email text
    #[serde(default = "default_brand")]
    pub brand: String,

    /// Seconds between background sweeps (0 disables sweeping)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Challenge lifetime and delivery settings
    #[serde(default)]
    pub otp: OtpConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// SMS gateway
    #[serde(default)]
    pub sms: SmsConfig,

    /// Email gateway
    #[serde(default)]
    pub email: EmailConfig,
}

/// OTP-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Challenge validity in seconds
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Upper bound on a single gateway call, in seconds
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            delivery_timeout_secs: default_delivery_timeout(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Sliding window length in seconds
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Maximum issue-requests per caller per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Key callers by the first X-Forwarded-For hop instead of the peer address
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            max_requests: default_max_requests(),
            trust_forwarded_for: false,
        }
    }
}

/// SMS provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    /// `console` or `twilio`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    /// Provider API root override
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: None,
        }
    }
}

/// Email provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// `console` or `sendgrid`
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub from_address: String,
    /// Provider API root override
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            from_address: String::new(),
            api_base: None,
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_brand() -> String { DEFAULT_BRAND.to_string() }
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_SECS }
fn default_ttl() -> u64 { OTP_TTL_SECS } // 10 minutes
fn default_delivery_timeout() -> u64 { DELIVERY_TIMEOUT_SECS }
fn default_window() -> u64 { RATE_LIMIT_WINDOW_SECS } // 15 minutes
fn default_max_requests() -> u32 { RATE_LIMIT_MAX_REQUESTS }
fn default_provider() -> String { "console".to_string() }

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            Self::from_file(config_path)?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()
            .context("Failed to load config file")?;

        settings
            .try_deserialize()
            .context("Failed to parse config")
    }

    /// Fill provider credentials left blank in the file from the environment
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        fill(&mut self.sms.account_sid, var("TWILIO_ACCOUNT_SID"));
        fill(&mut self.sms.auth_token, var("TWILIO_AUTH_TOKEN"));
        fill(&mut self.sms.from_number, var("TWILIO_PHONE_NUMBER"));
        fill(&mut self.email.api_key, var("SENDGRID_API_KEY"));
        fill(&mut self.email.from_address, var("EMAIL_FROM"));
    }

    fn validate(&self) -> Result<()> {
        check_duration("otp.ttl_secs", self.otp.ttl_secs)?;
        check_duration("otp.delivery_timeout_secs", self.otp.delivery_timeout_secs)?;
        check_duration("rate_limit.window_secs", self.rate_limit.window_secs)?;
        Ok(())
    }
}

/// Durations must be non-zero and small enough that timestamp arithmetic
/// cannot overflow
fn check_duration(name: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        bail!("{name} must be greater than zero");
    }
    if secs > MAX_DURATION_SECS {
        bail!("{name} must be at most {MAX_DURATION_SECS} (one year), got {secs}");
    }
    Ok(())
}

fn fill(slot: &mut String, value: Option<String>) {
    if slot.is_empty() {
        if let Some(value) = value {
            *slot = value;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            brand: default_brand(),
            sweep_interval_secs: default_sweep_interval(),
            otp: OtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            sms: SmsConfig::default(),
            email: EmailConfig::default(),
        }
    }
}
