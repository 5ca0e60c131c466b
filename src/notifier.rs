//! Outcome delivery.
//!
//! Rendering and transport live outside this crate. A [`Notifier`] only
//! has to get resolved-task text to the channel the task was started from.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use crate::activity::ChannelId;

/// Opaque file attached to an outcome (loot images, charts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text delivered to a channel once a task resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// Message without attachments.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }
}

/// Delivery contract. Failures are reported but never undo resolved state.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `message` to `channel`.
    async fn send(&self, channel: &ChannelId, message: OutboundMessage) -> anyhow::Result<()>;
}

/// Forwards messages into an mpsc channel for an embedding application.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(ChannelId, OutboundMessage)>,
}

impl ChannelNotifier {
    /// Forward into an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<(ChannelId, OutboundMessage)>) -> Self {
        Self { tx }
    }

    /// Notifier plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<(ChannelId, OutboundMessage)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, channel: &ChannelId, message: OutboundMessage) -> anyhow::Result<()> {
        self.tx
            .send((channel.clone(), message))
            .map_err(|_| anyhow::anyhow!("outcome receiver for channel {channel} dropped"))
    }
}

/// Writes outcomes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, channel: &ChannelId, message: OutboundMessage) -> anyhow::Result<()> {
        info!(
            channel = %channel,
            attachments = message.attachments.len(),
            "{}",
            message.text
        );
        Ok(())
    }
}
