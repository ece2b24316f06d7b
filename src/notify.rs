use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// One push notification, addressed by device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug)]
pub enum NotifyError {
    /// The recipient has no push token registered.
    MissingToken(ulid::Ulid),
    RecipientNotFound(ulid::Ulid),
    Delivery(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::MissingToken(id) => write!(f, "user {id} has no push token"),
            NotifyError::RecipientNotFound(id) => write!(f, "recipient not found: {id}"),
            NotifyError::Delivery(e) => write!(f, "delivery failed: {e}"),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Push delivery contract. Best effort; callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn dispatch(&self, message: PushMessage) -> Result<(), NotifyError>;
}

/// In-process push target: one broadcast channel per device token.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<PushMessage>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to messages for a device token. Creates the channel if needed.
    pub fn subscribe(&self, token: &str) -> broadcast::Receiver<PushMessage> {
        let sender = self
            .channels
            .entry(token.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Deliver to every subscriber of `message.token`. No-op if nobody is listening.
    pub fn send(&self, message: &PushMessage) -> usize {
        match self.channels.get(&message.token) {
            Some(sender) => sender.send(message.clone()).unwrap_or(0),
            None => 0,
        }
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn dispatch(&self, message: PushMessage) -> Result<(), NotifyError> {
        let delivered = self.send(&message);
        tracing::debug!("push to {} reached {delivered} subscriber(s)", message.token);
        Ok(())
    }
}
