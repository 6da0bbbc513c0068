//! Challenge issuing: generate, store, dispatch.

use chrono::Duration;
use herald_common::constants::{OTP_CODE_MAX, OTP_CODE_MIN};
use herald_common::{DeliveryMethod, IssueReceipt, OtpError, mask_contact};
use rand::Rng;
use std::sync::Arc;

use super::OtpStore;
use crate::gateway::{EmailGateway, GatewayError, SmsGateway};

/// Issuer settings
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// Challenge lifetime
    pub ttl: Duration,
    /// Upper bound on one gateway call
    pub delivery_timeout: std::time::Duration,
    /// Name shown in message text
    pub brand: String,
}

/// Creates challenges and hands them to the matching gateway
pub struct ChallengeIssuer {
    store: Arc<OtpStore>,
    sms: Arc<dyn SmsGateway>,
    email: Arc<dyn EmailGateway>,
    config: IssuerConfig,
}

impl ChallengeIssuer {
    pub fn new(
        store: Arc<OtpStore>,
        sms: Arc<dyn SmsGateway>,
        email: Arc<dyn EmailGateway>,
        config: IssuerConfig,
    ) -> Self {
        Self {
            store,
            sms,
            email,
            config,
        }
    }

    /// Issue a fresh code for `contact` over `method`
    ///
    /// The challenge is stored before dispatch and stays stored when delivery
    /// fails; the caller can simply issue again.
    pub async fn issue(&self, contact: &str, method: &str) -> Result<IssueReceipt, OtpError> {
        let method: DeliveryMethod = method.parse()?;
        let code = generate_code();

        let challenge = self.store.put(contact, &code, method, self.config.ttl);

        self.dispatch(contact, method, &code).await?;

        tracing::info!(
            contact = %mask_contact(contact),
            method = %method,
            expires_at = %challenge.expires_at,
            "OTP issued"
        );

        Ok(IssueReceipt {
            contact: challenge.contact,
            expires_at: challenge.expires_at,
        })
    }

    async fn dispatch(
        &self,
        contact: &str,
        method: DeliveryMethod,
        code: &str,
    ) -> Result<(), OtpError> {
        let body = message_body(&self.config.brand, code);

        let delivery = async {
            match method {
                DeliveryMethod::Sms => self.sms.send(contact, &body).await,
                DeliveryMethod::Email => {
                    let subject = email_subject(&self.config.brand);
                    self.email.send(contact, &subject, &body).await
                }
            }
        };

        match tokio::time::timeout(self.config.delivery_timeout, delivery).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::error!(
                    contact = %mask_contact(contact),
                    method = %method,
                    provider = self.provider_name(method),
                    error = %e,
                    "OTP delivery failed"
                );
                Err(delivery_failed(e))
            }
            Err(_) => {
                tracing::error!(
                    contact = %mask_contact(contact),
                    method = %method,
                    provider = self.provider_name(method),
                    timeout_ms = self.config.delivery_timeout.as_millis() as u64,
                    "OTP delivery timed out"
                );
                Err(OtpError::DeliveryFailed(format!(
                    "delivery timed out after {:?}",
                    self.config.delivery_timeout
                )))
            }
        }
    }

    fn provider_name(&self, method: DeliveryMethod) -> &'static str {
        match method {
            DeliveryMethod::Sms => self.sms.provider_name(),
            DeliveryMethod::Email => self.email.provider_name(),
        }
    }
}

fn delivery_failed(e: GatewayError) -> OtpError {
    OtpError::DeliveryFailed(e.to_string())
}

/// Uniform code in 100000..=999999, never with a leading zero
fn generate_code() -> String {
    rand::rng().random_range(OTP_CODE_MIN..=OTP_CODE_MAX).to_string()
}

fn message_body(brand: &str, code: &str) -> String {
    format!("Your OTP for {brand} is: {code}")
}

fn email_subject(brand: &str) -> String {
    format!("OTP Verification - {brand}")
}
