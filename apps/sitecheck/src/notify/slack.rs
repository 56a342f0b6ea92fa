use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::channel::http_client;
use super::{Channel, Message};
use crate::config::SlackConfig;
use crate::error::ChannelError;

const CHANNEL: &str = "slack";

/// Slack incoming-webhook channel
pub struct SlackChannel {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackChannel {
    /// A webhook that does not answer within `timeout` counts as failed
    pub fn new(config: SlackConfig, timeout: Duration) -> Result<Self, ChannelError> {
        Ok(Self { config, client: http_client(CHANNEL, timeout)? })
    }
}

#[async_trait]
impl Channel for SlackChannel {
    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let payload = json!({ "text": message.text() });

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| ChannelError::Request { channel: CHANNEL, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Status { channel: CHANNEL, status: status.as_u16(), body });
        }

        debug!(status = status.as_u16(), "Slack webhook accepted message");
        Ok(())
    }

    fn name(&self) -> &'static str {
        CHANNEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::channel::testing::stalled_server;
    use mockito::Matcher;

    fn slack_channel(webhook_url: String) -> SlackChannel {
        SlackChannel::new(SlackConfig { webhook_url }, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/services/T/B/X")
            .match_body(Matcher::Json(json!({ "text": "Sitecheck 1 error(s):\nhttp://a.example/: down" })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let channel = slack_channel(format!("{}/services/T/B/X", server.url()));
        let message = Message::new(vec!["Sitecheck 1 error(s):".into(), "http://a.example/: down".into()]);
        channel.send(&message).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_webhook_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/hook").with_status(404).with_body("no_service").create_async().await;

        let channel = slack_channel(format!("{}/hook", server.url()));
        let error = channel.send(&Message::new(vec!["hi".into()])).await.unwrap_err();

        assert!(matches!(error, ChannelError::Status { status: 404, .. }));
        assert_eq!(error.to_string(), "slack returned status 404: no_service");
    }

    #[tokio::test]
    async fn test_silent_webhook_times_out() {
        let webhook_url = format!("{}/hook", stalled_server().await);
        let channel = SlackChannel::new(SlackConfig { webhook_url }, Duration::from_secs(1)).unwrap();

        let sent = tokio::time::timeout(Duration::from_secs(10), channel.send(&Message::new(vec!["hi".into()])))
            .await
            .expect("send should be bounded by the client timeout");

        assert!(matches!(sent, Err(ChannelError::Request { channel: "slack", .. })), "got {sent:?}");
    }
}
