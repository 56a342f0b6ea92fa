use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::channel::http_client;
use super::{Channel, Message};
use crate::config::SmsConfig;
use crate::error::ChannelError;

const CHANNEL: &str = "sms";
const TWILIO_API: &str = "https://api.twilio.com";

/// Twilio SMS channel.
///
/// Each message line goes out as its own SMS to stay under carrier length
/// limits.
pub struct SmsChannel {
    config: SmsConfig,
    client: reqwest::Client,
    base_url: String,
}

impl SmsChannel {
    pub fn new(config: SmsConfig, timeout: Duration) -> Result<Self, ChannelError> {
        Ok(Self { config, client: http_client(CHANNEL, timeout)?, base_url: TWILIO_API.to_string() })
    }

    /// Send to another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    async fn send_line(&self, line: &str) -> Result<(), ChannelError> {
        let form = [
            ("To", self.config.to_number.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Body", line),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|source| ChannelError::Request { channel: CHANNEL, source })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChannelError::Status { channel: CHANNEL, status: status.as_u16(), body });
        }

        let sid = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("sid").and_then(|sid| sid.as_str()).map(str::to_string));
        debug!(?sid, "Twilio accepted message");
        Ok(())
    }
}

#[async_trait]
impl Channel for SmsChannel {
    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        for line in message.lines() {
            self.send_line(line).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        CHANNEL
    }
}
