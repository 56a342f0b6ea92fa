//! Notification channels and dispatch.

pub mod channel;
pub mod slack;
pub mod sms;

use std::time::Duration;

use tracing::{error, info};

pub use channel::Channel;
pub use slack::SlackChannel;
pub use sms::SmsChannel;

use crate::config::Config;
use crate::detector::Decision;
use crate::error::ChannelError;

/// Plain-text notification, kept as lines so SMS can send one per line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    lines: Vec<String>,
}

impl Message {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Compose the message for a decision, `None` when nothing is sent
    pub fn for_decision(decision: &Decision) -> Option<Self> {
        match decision {
            Decision::NoNotify => None,
            Decision::NotifyFailing { errors, messages } => {
                let mut lines = vec![format!("Sitecheck {} error(s):", errors)];
                lines.extend(messages.iter().cloned());
                Some(Self::new(lines))
            }
            Decision::NotifyRecovered { previous_errors, previous_messages } => {
                let mut lines =
                    vec![format!("Sitecheck PASS: recovered from {} error(s)", previous_errors)];
                lines.extend(previous_messages.iter().map(|m| format!("resolved: {}", m)));
                Some(Self::new(lines))
            }
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Which channels took a message and which did not
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub delivered: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Sends messages through every configured channel
#[derive(Default)]
pub struct Notifier {
    channels: Vec<Box<dyn Channel>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// One channel per configured transport; missing transports are skipped.
    ///
    /// Each channel request gives up after `timeout`.
    pub fn from_config(config: &Config, timeout: Duration) -> Result<Self, ChannelError> {
        let mut notifier = Self::new();

        if let Some(sms_config) = &config.sms {
            notifier.add_channel(Box::new(SmsChannel::new(sms_config.clone(), timeout)?));
        }

        if let Some(slack_config) = &config.slack {
            notifier.add_channel(Box::new(SlackChannel::new(slack_config.clone(), timeout)?));
        }

        Ok(notifier)
    }

    pub fn add_channel(&mut self, channel: Box<dyn Channel>) {
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Compose and send the message for `decision`, if it has one
    pub async fn notify(&self, decision: &Decision) -> DispatchSummary {
        match Message::for_decision(decision) {
            Some(message) => self.dispatch(&message).await,
            None => DispatchSummary::default(),
        }
    }

    /// Send through each channel in turn. A failing channel is logged and
    /// does not stop the others.
    pub async fn dispatch(&self, message: &Message) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        for channel in &self.channels {
            match channel.send(message).await {
                Ok(()) => {
                    info!("Notification sent via {}", channel.name());
                    summary.delivered.push(channel.name());
                }
                Err(e) => {
                    error!("Failed to send notification via {}: {}", channel.name(), e);
                    summary.failed.push(channel.name());
                }
            }
        }

        summary
    }
}
