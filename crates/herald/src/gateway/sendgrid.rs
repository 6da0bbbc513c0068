//! SendGrid email delivery over the v3 `mail/send` API.

use anyhow::{Result, bail};
use async_trait::async_trait;
use herald_common::mask_contact;
use serde_json::json;

use super::{EmailGateway, GatewayError};
use crate::config::EmailConfig;

const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    /// Verified sender address
    pub from_address: String,
    pub api_base: String,
}

impl SendGridConfig {
    pub fn from_email_config(config: &EmailConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            bail!("SendGrid api_key is not set (email.api_key or SENDGRID_API_KEY)");
        }
        if config.from_address.is_empty() {
            bail!("SendGrid from_address is not set (email.from_address or EMAIL_FROM)");
        }

        Ok(Self {
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| SENDGRID_API_BASE.to_string()),
        })
    }
}

pub struct SendGridEmail {
    config: SendGridConfig,
    http: reqwest::Client,
}

impl SendGridEmail {
    pub fn new(config: SendGridConfig, http: reqwest::Client) -> Self {
        tracing::info!(from = %config.from_address, "SendGrid email gateway initialized");
        Self { config, http }
    }
}

#[async_trait]
impl EmailGateway for SendGridEmail {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.config.from_address },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });

        let url = format!("{}/v3/mail/send", self.config.api_base.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
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

        tracing::info!(to = %mask_contact(to), "Email sent");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "sendgrid"
    }
}
