//! Delivery gateways.
//!
//! The issuer only needs to know whether a message went out. Each provider
//! sits behind [`SmsGateway`] or [`EmailGateway`]; which one is used is
//! decided by configuration at startup.

mod console;
mod sendgrid;
mod twilio;

pub use console::ConsoleGateway;
pub use sendgrid::{SendGridConfig, SendGridEmail};
pub use twilio::{TwilioConfig, TwilioSms};

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{EmailConfig, SmsConfig};

/// Why a gateway could not deliver
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered but refused the message
    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `body` as a text message to `to`
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError>;

    fn provider_name(&self) -> &'static str;
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Send a plain-text email
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError>;

    fn provider_name(&self) -> &'static str;
}

/// Build the SMS gateway named by `config.provider`
pub fn build_sms_gateway(config: &SmsConfig, http: reqwest::Client) -> Result<Arc<dyn SmsGateway>> {
    match config.provider.as_str() {
        "console" => Ok(Arc::new(ConsoleGateway)),
        "twilio" => {
            let twilio = TwilioSms::new(TwilioConfig::from_sms_config(config)?, http);
            Ok(Arc::new(twilio))
        }
        other => bail!("Unknown SMS provider '{other}' (expected console or twilio)"),
    }
}

/// Build the email gateway named by `config.provider`
pub fn build_email_gateway(
    config: &EmailConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn EmailGateway>> {
    match config.provider.as_str() {
        "console" => Ok(Arc::new(ConsoleGateway)),
        "sendgrid" => {
            let sendgrid = SendGridEmail::new(SendGridConfig::from_email_config(config)?, http);
            Ok(Arc::new(sendgrid))
        }
        other => bail!("Unknown email provider '{other}' (expected console or sendgrid)"),
    }
}
