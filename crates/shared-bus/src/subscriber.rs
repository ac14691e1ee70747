//! # Consumer Groups
//!
//! The consuming side of the in-memory bus. A group owns one cursor into
//! the broadcast channel; concurrent `consume` calls on the same group
//! share that cursor, so each message is handed to exactly one of them.

use crate::events::{BusError, BusMessage};
use tokio::sync::{broadcast, Mutex};
use tracing::warn;

/// A named cursor over a set of topics.
pub struct ConsumerGroup {
    /// Group name.
    name: String,

    /// Topics delivered to this group.
    topics: Vec<String>,

    /// The broadcast receiver (shared by all consumers of the group).
    receiver: Mutex<broadcast::Receiver<BusMessage>>,
}

impl ConsumerGroup {
    /// Create a new consumer group.
    pub(crate) fn new(
        name: &str,
        topics: Vec<String>,
        receiver: broadcast::Receiver<BusMessage>,
    ) -> Self {
        Self {
            name: name.to_string(),
            topics,
            receiver: Mutex::new(receiver),
        }
    }

    /// Receive the next message on one of the group's topics.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Closed` once the bus has been dropped.
    pub async fn recv(&self) -> Result<BusMessage, BusError> {
        let mut receiver = self.receiver.lock().await;
        loop {
            let message = match receiver.recv().await {
                Ok(m) => m,
                Err(broadcast::error::RecvError::Closed) => return Err(BusError::Closed),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        group = %self.name,
                        lagged = count,
                        "Consumer group lagged, messages dropped"
                    );
                    continue;
                }
            };

            if self.accepts(&message.topic) {
                return Ok(message);
            }
            // Topic not registered for this group, keep waiting
        }
    }

    /// Whether messages on `topic` are delivered to this group.
    #[must_use]
    pub fn accepts(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    /// Get the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the registered topics.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_topic_filter() {
        let (tx, _) = broadcast::channel(4);
        let group = ConsumerGroup::new("api", vec!["device.responses".into()], tx.subscribe());
        assert!(group.accepts("device.responses"));
        assert!(!group.accepts("device.commands"));
        assert_eq!(group.name(), "api");
        assert_eq!(group.topics().len(), 1);
    }

    #[tokio::test]
    async fn test_recv_closed() {
        let (tx, rx) = broadcast::channel::<BusMessage>(4);
        let group = ConsumerGroup::new("api", vec!["t".into()], rx);
        drop(tx);
        assert!(matches!(group.recv().await, Err(BusError::Closed)));
    }

    #[tokio::test]
    async fn test_recv_after_lag() {
        let (tx, rx) = broadcast::channel::<BusMessage>(2);
        let group = ConsumerGroup::new("api", vec!["t".into()], rx);

        for i in 0..5 {
            tx.send(BusMessage::new("t", i.to_string())).unwrap();
        }

        // Oldest messages were overwritten; the group resumes at the oldest retained one
        let msg = timeout(Duration::from_millis(100), group.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(msg.payload, "3");
    }
}
