//! # Message Bus Port
//!
//! Defines the publish/consume contract and the in-memory implementation.

use crate::events::{BusError, BusMessage};
use crate::subscriber::ConsumerGroup;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publish/consume primitive offered by the bus transport.
///
/// Delivery is at-least-once with no ordering across partitions; callers
/// must treat every payload as possibly duplicated or reordered.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload to a topic.
    ///
    /// # Errors
    ///
    /// Returns `BusError` when the transport refuses the message.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError>;

    /// Pull the next message for a consumer group, blocking until one arrives.
    ///
    /// # Errors
    ///
    /// - `BusError::Closed` - no further messages will arrive
    /// - `BusError::UnknownConsumerGroup` - the group was never registered
    /// - `BusError::Transport` - transient failure, safe to retry
    async fn consume(&self, consumer_group: &str) -> Result<BusMessage, BusError>;
}

/// In-memory implementation of the message bus.
///
/// Uses `tokio::sync::broadcast` so every consumer group sees every message
/// on the topics it registered for. Suitable for a single process; real
/// deployments plug a broker-backed `MessageBus` in instead.
pub struct InMemoryMessageBus {
    /// Broadcast sender shared by all topics.
    sender: broadcast::Sender<BusMessage>,

    /// Registered consumer groups by name.
    groups: RwLock<HashMap<String, Arc<ConsumerGroup>>>,

    /// Total messages published.
    messages_published: AtomicU64,

    /// Channel capacity.
    capacity: usize,
}

impl InMemoryMessageBus {
    /// Create a new in-memory bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new in-memory bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            groups: RwLock::new(HashMap::new()),
            messages_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Register a consumer group for a set of topics.
    ///
    /// Messages published before registration are not delivered to the
    /// group. Registering an existing name replaces its topic set and
    /// starts it from the current position.
    pub fn register_consumer_group(&self, name: &str, topics: &[&str]) {
        let group = Arc::new(ConsumerGroup::new(
            name,
            topics.iter().map(|t| (*t).to_string()).collect(),
            self.sender.subscribe(),
        ));

        self.groups.write().insert(name.to_string(), group);

        debug!(group = name, topics = ?topics, "Consumer group registered");
    }

    /// Number of registered consumer groups.
    #[must_use]
    pub fn consumer_group_count(&self) -> usize {
        self.groups.read().len()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the total number of messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    fn group(&self, name: &str) -> Option<Arc<ConsumerGroup>> {
        self.groups.read().get(name).cloned()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        // Always increment counter (publish was attempted)
        self.messages_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(BusMessage::new(topic, payload)) {
            Ok(receivers) => {
                debug!(topic = topic, receivers = receivers, "Message published");
            }
            Err(_) => {
                // No consumer groups - a broker would retain it, we cannot
                warn!(topic = topic, "Message dropped (no consumer groups)");
            }
        }
        Ok(())
    }

    async fn consume(&self, consumer_group: &str) -> Result<BusMessage, BusError> {
        let group = self
            .group(consumer_group)
            .ok_or_else(|| BusError::UnknownConsumerGroup(consumer_group.to_string()))?;
        group.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_publish_no_consumers() {
        let bus = InMemoryMessageBus::new();
        bus.publish("device.commands", "{}".into()).await.unwrap();
        assert_eq!(bus.messages_published(), 1);
    }

    #[tokio::test]
    async fn test_consume_registered_topic() {
        let bus = InMemoryMessageBus::new();
        bus.register_consumer_group("api", &["device.responses"]);

        bus.publish("device.responses", "hello".into()).await.unwrap();

        let msg = timeout(Duration::from_millis(100), bus.consume("api"))
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.topic, "device.responses");
        assert_eq!(msg.payload, "hello");
    }

    #[tokio::test]
    async fn test_consume_skips_other_topics() {
        let bus = InMemoryMessageBus::new();
        bus.register_consumer_group("api", &["device.responses"]);

        bus.publish("device.commands", "not for us".into()).await.unwrap();
        bus.publish("device.responses", "for us".into()).await.unwrap();

        let msg = timeout(Duration::from_millis(100), bus.consume("api"))
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, "for us");
    }

    #[tokio::test]
    async fn test_every_group_sees_every_message() {
        let bus = InMemoryMessageBus::new();
        bus.register_consumer_group("api", &["device.responses"]);
        bus.register_consumer_group("audit", &["device.responses"]);
        assert_eq!(bus.consumer_group_count(), 2);

        bus.publish("device.responses", "x".into()).await.unwrap();

        for group in ["api", "audit"] {
            let msg = timeout(Duration::from_millis(100), bus.consume(group))
                .await
                .expect("timeout")
                .expect("message");
            assert_eq!(msg.payload, "x");
        }
    }

    #[tokio::test]
    async fn test_unknown_group() {
        let bus = InMemoryMessageBus::new();
        let result = bus.consume("nobody").await;
        assert!(matches!(result, Err(BusError::UnknownConsumerGroup(_))));
    }

    #[tokio::test]
    async fn test_reregister_replaces_group() {
        let bus = InMemoryMessageBus::new();
        bus.register_consumer_group("api", &["device.commands"]);
        bus.register_consumer_group("api", &["device.responses"]);
        assert_eq!(bus.consumer_group_count(), 1);

        bus.publish("device.commands", "old topic".into()).await.unwrap();
        bus.publish("device.responses", "new topic".into()).await.unwrap();

        let msg = timeout(Duration::from_millis(100), bus.consume("api"))
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, "new topic");
    }

    #[test]
    fn test_custom_capacity() {
        let bus = InMemoryMessageBus::with_capacity(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.consumer_group_count(), 0);
    }
}
