//! Development gateway that writes messages to the log instead of sending them.

use async_trait::async_trait;

use super::{EmailGateway, GatewayError, SmsGateway};

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleGateway;

#[async_trait]
impl SmsGateway for ConsoleGateway {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        tracing::info!(to = %to, body = %body, "📱 [console] SMS");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }
}

#[async_trait]
impl EmailGateway for ConsoleGateway {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        tracing::info!(to = %to, subject = %subject, body = %body, "📧 [console] email");
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "console"
    }
}
