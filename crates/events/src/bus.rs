//! Named-topic message bus.
//!
//! [`MessageBus`] is the seam between the pipeline and its transport.
//! [`LocalBus`] implements it in-process with one `tokio::sync::broadcast`
//! channel per topic and is shared via `Arc<LocalBus>` (or
//! `Arc<dyn MessageBus>`) across the application.
//!
//! Payloads are opaque text. Every subscriber of a topic receives every
//! message published after it subscribed; messages published to a topic
//! with no subscribers are dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Transport-level bus failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Message bus is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// MessageBus
// ---------------------------------------------------------------------------

/// Publish/subscribe transport with named topics.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish `payload` to every current subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError>;

    /// Start receiving messages published to `topic` from now on.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A live subscription to one topic.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<String>,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, receiver: broadcast::Receiver<String>) -> Self {
        Self {
            topic: topic.into(),
            receiver,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the bus is closed and the backlog is drained.
    /// A receiver that fell behind logs how many messages it missed and
    /// carries on with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(topic = %self.topic, skipped = n, "Subscriber lagged, skipped messages");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(topic = %self.topic, "Topic closed");
                    return None;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// LocalBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for each topic channel.
pub const DEFAULT_CAPACITY: usize = 1024;

struct Topics {
    closed: bool,
    senders: HashMap<String, broadcast::Sender<String>>,
}

/// In-process bus. Topics are created on first subscribe.
pub struct LocalBus {
    capacity: usize,
    topics: RwLock<Topics>,
}

impl LocalBus {
    /// Create a bus whose topic channels buffer `capacity` messages.
    ///
    /// When a topic buffer is full the oldest un-consumed messages are
    /// dropped and slow subscribers observe a lag.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: RwLock::new(Topics {
                closed: false,
                senders: HashMap::new(),
            }),
        }
    }

    /// Number of live subscribers on `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .await
            .senders
            .get(topic)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Close every topic. Subscriptions drain their backlog and then end;
    /// later publishes and subscribes fail with [`BusError::Closed`].
    pub async fn close(&self) {
        let mut topics = self.topics.write().await;
        topics.closed = true;
        let count = topics.senders.len();
        topics.senders.clear();
        tracing::info!(topics = count, "Message bus closed");
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        let topics = self.topics.read().await;
        if topics.closed {
            return Err(BusError::Closed);
        }
        match topics.senders.get(topic) {
            Some(sender) => {
                // A send error only means there are zero receivers.
                if sender.send(payload).is_err() {
                    tracing::debug!(topic, "Published with no subscribers");
                }
            }
            None => tracing::debug!(topic, "Published to topic nobody subscribed to"),
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let mut topics = self.topics.write().await;
        if topics.closed {
            return Err(BusError::Closed);
        }
        let capacity = self.capacity;
        let receiver = topics
            .senders
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .subscribe();
        Ok(Subscription::new(topic, receiver))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
