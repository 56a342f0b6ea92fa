use std::time::Duration;

use async_trait::async_trait;

use super::Message;
use crate::error::ChannelError;

/// A transport that delivers a notification message
#[async_trait]
pub trait Channel: Send + Sync {
    /// Deliver the message through this channel
    async fn send(&self, message: &Message) -> Result<(), ChannelError>;

    /// Channel name for logging
    fn name(&self) -> &'static str;
}

/// HTTP client for a channel; every request is bounded by `timeout`
pub(crate) fn http_client(channel: &'static str, timeout: Duration) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("sitecheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| ChannelError::Request { channel, source })
}
