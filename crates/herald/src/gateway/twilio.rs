//! Twilio SMS delivery over the Messages REST API.

use anyhow::{Result, bail};
use async_trait::async_trait;
use herald_common::mask_contact;

use super::{GatewayError, SmsGateway};
use crate::config::SmsConfig;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio credentials and sender number
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// E.164 number owned by the account
    pub from_number: String,
    /// API root, overridable for tests
    pub api_base: String,
}

impl TwilioConfig {
    pub fn from_sms_config(config: &SmsConfig) -> Result<Self> {
        if config.account_sid.is_empty() {
            bail!("Twilio account_sid is not set (sms.account_sid or TWILIO_ACCOUNT_SID)");
        }
        if config.auth_token.is_empty() {
            bail!("Twilio auth_token is not set (sms.auth_token or TWILIO_AUTH_TOKEN)");
        }
        if config.from_number.is_empty() {
            bail!("Twilio from_number is not set (sms.from_number or TWILIO_PHONE_NUMBER)");
        }

        Ok(Self {
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| TWILIO_API_BASE.to_string()),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

pub struct TwilioSms {
    config: TwilioConfig,
    http: reqwest::Client,
}

impl TwilioSms {
    pub fn new(config: TwilioConfig, http: reqwest::Client) -> Self {
        tracing::info!(
            from = %mask_contact(&config.from_number),
            "Twilio SMS gateway initialized"
        );
        Self { config, http }
    }
}

#[async_trait]
impl SmsGateway for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let params = [
            ("To", to),
            ("From", self.config.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .http
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %mask_contact(to), "SMS sent");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "twilio"
    }
}
