//! Command publisher.

use crate::domain::GatewayError;
use crate::ports::TimeSource;
use shared_bus::MessageBus;
use shared_types::{Cmd, CommandEnvelope, CommandPayload, RequestUuid};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds command envelopes and publishes them to the command topic.
///
/// Fire-and-forget: the publisher never looks at responses. The caller
/// owns the `RequestUuid` and waits on it separately.
pub struct CommandPublisher {
    bus: Arc<dyn MessageBus>,
    topic: String,
    clock: Arc<dyn TimeSource>,
}

impl CommandPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic: impl Into<String>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            clock,
        }
    }

    /// Publish `cmd` for `command_id` under the caller's `request_uuid`.
    ///
    /// Returns the envelope exactly as published.
    pub async fn publish(
        &self,
        request_uuid: RequestUuid,
        command_id: &str,
        cmd: Cmd,
        payload: CommandPayload,
    ) -> Result<CommandEnvelope, GatewayError> {
        let envelope = CommandEnvelope::new(request_uuid, command_id, cmd, self.clock.now())
            .with_payload(payload);
        let body = serde_json::to_string(&envelope)?;

        if let Err(source) = self.bus.publish(&self.topic, body).await {
            warn!(
                request_uuid = %request_uuid,
                cmd = %cmd,
                error = %source,
                "Command publish failed"
            );
            return Err(GatewayError::Publish {
                request_uuid,
                cmd,
                source,
            });
        }

        debug!(
            request_uuid = %request_uuid,
            command_id = command_id,
            cmd = %cmd,
            topic = %self.topic,
            "Command published"
        );
        Ok(envelope)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
