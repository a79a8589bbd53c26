//! SMS transport.
//!
//! The dispatcher only depends on [`SmsTransport`]. Two implementations ship
//! with the crate:
//!
//! - [`HttpSmsGateway`]: posts JSON to an HTTP SMS gateway
//! - [`LogOnlySms`]: logs the message and reports success (dry run)
//!
//! Message length limits are enforced by the caller, not here.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::mask_phone;

/// One outbound SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmsMessage {
    pub phone_number: String,
    pub message: String,
}

/// Sends a single SMS. May fail on transport errors.
#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, sms: SmsMessage) -> anyhow::Result<()>;
}

/// Client for an HTTP SMS gateway accepting `{"phoneNumber", "message"}`.
#[derive(Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayRequest<'a> {
    phone_number: &'a str,
    message: &'a str,
}

impl HttpSmsGateway {
    pub fn new(url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            token,
        }
    }
}

#[async_trait]
impl SmsTransport for HttpSmsGateway {
    async fn send_sms(&self, sms: SmsMessage) -> anyhow::Result<()> {
        let body = GatewayRequest {
            phone_number: &sms.phone_number,
            message: &sms.message,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("sms gateway returned status {}", status.as_u16());
        }

        debug!(phone = %mask_phone(&sms.phone_number), "SMS accepted by gateway");
        Ok(())
    }
}

/// Transport that only logs. Used when no gateway is configured.
#[derive(Debug, Clone, Default)]
pub struct LogOnlySms;

#[async_trait]
impl SmsTransport for LogOnlySms {
    async fn send_sms(&self, sms: SmsMessage) -> anyhow::Result<()> {
        info!(
            phone = %mask_phone(&sms.phone_number),
            length = sms.message.chars().count(),
            message = %sms.message,
            "SMS (dry run)"
        );
        Ok(())
    }
}
