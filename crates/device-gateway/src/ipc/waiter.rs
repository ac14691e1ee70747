//! Waiter - turns a published command into a bounded wait for its answer.
//!
//! A waiter races three things: the key's notifier (fired by the store),
//! a poll tick of period `P`, and the deadline `D`. Every wake is followed
//! by a `load()`, so a notification lost to a race is caught by the next
//! tick at the latest.
//!
//! ```text
//! Pending ──load() hit──────────→ Fulfilled
//!    │
//!    └──deadline, final load() miss──→ TimedOut
//! ```
//!
//! A response that lands after `TimedOut` stays in the store unclaimed.

use crate::domain::{CorrelationStore, GatewayError};
use shared_types::{
    DeviceInfo, DiscoveredDevice, NetworkConfig, RequestUuid, ResponseMessage, VideoConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Payload a successful response is expected to carry.
pub trait ExpectedPayload: Sized {
    /// Human name used in `UnexpectedPayload` errors.
    const DESCRIPTION: &'static str;

    /// Pull the payload out of a SUCCESS response.
    fn extract(message: ResponseMessage) -> Option<Self>;
}

impl ExpectedPayload for NetworkConfig {
    const DESCRIPTION: &'static str = "NetworkConfig";

    fn extract(message: ResponseMessage) -> Option<Self> {
        message.payload.network_config
    }
}

impl ExpectedPayload for VideoConfig {
    const DESCRIPTION: &'static str = "VideoConfig";

    fn extract(message: ResponseMessage) -> Option<Self> {
        message.payload.video_config
    }
}

impl ExpectedPayload for Vec<DiscoveredDevice> {
    const DESCRIPTION: &'static str = "DeviceList";

    // An empty subnet is a valid answer; workers omit the list then
    fn extract(message: ResponseMessage) -> Option<Self> {
        Some(message.payload.device_list.unwrap_or_default())
    }
}

impl ExpectedPayload for DeviceInfo {
    const DESCRIPTION: &'static str = "DeviceInfo";

    fn extract(message: ResponseMessage) -> Option<Self> {
        message.payload.device_info
    }
}

/// SUCCESS with no payload of interest (SET_*, REBOOT).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledged;

impl ExpectedPayload for Acknowledged {
    const DESCRIPTION: &'static str = "acknowledgement";

    fn extract(_message: ResponseMessage) -> Option<Self> {
        Some(Acknowledged)
    }
}

/// Unsubscribes from the store however the wait ends (including drop).
struct SubscriptionGuard<'a> {
    store: &'a CorrelationStore,
    key: RequestUuid,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.key);
    }
}

/// Waits for responses in a [`CorrelationStore`].
#[derive(Clone)]
pub struct Waiter {
    store: Arc<CorrelationStore>,
    poll_interval: Duration,
}

impl Waiter {
    pub fn new(store: Arc<CorrelationStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            // interval() panics on zero
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait up to `deadline` for the response to `request_uuid`.
    ///
    /// The response is returned whatever its `Status`; see
    /// [`await_payload`](Self::await_payload) for the typed variant.
    pub async fn wait(
        &self,
        request_uuid: RequestUuid,
        deadline: Duration,
    ) -> Result<ResponseMessage, GatewayError> {
        let started = Instant::now();
        let notify = self.store.subscribe(request_uuid);
        let _guard = SubscriptionGuard {
            store: &self.store,
            key: request_uuid,
        };

        // Saturates on huge deadlines
        let expiry = tokio::time::sleep(deadline);
        tokio::pin!(expiry);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if let Some(response) = self.store.load(&request_uuid) {
                debug!(
                    request_uuid = %request_uuid,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Response received"
                );
                return Ok(response);
            }

            tokio::select! {
                _ = &mut expiry => break,
                _ = notify.notified() => {}
                _ = ticker.tick() => {}
            }
        }

        // Answer may have landed in the same instant the deadline fired
        if let Some(response) = self.store.load(&request_uuid) {
            return Ok(response);
        }

        warn!(
            request_uuid = %request_uuid,
            deadline_ms = deadline.as_millis() as u64,
            "Timed out waiting for device response"
        );
        Err(GatewayError::Timeout {
            request_uuid,
            waited: deadline,
        })
    }

    /// Wait for a SUCCESS response carrying `T`.
    ///
    /// # Errors
    ///
    /// - `Timeout` - nothing arrived in time
    /// - `DeviceFailure` - the worker answered `Status=FAILURE`
    /// - `UnexpectedPayload` - SUCCESS without the expected payload
    pub async fn await_payload<T: ExpectedPayload>(
        &self,
        request_uuid: RequestUuid,
        deadline: Duration,
    ) -> Result<T, GatewayError> {
        let response = self.wait(request_uuid, deadline).await?;
        let cmd = response.cmd;

        if !response.is_success() {
            let status = response.response_status;
            debug!(
                request_uuid = %request_uuid,
                cmd = %cmd,
                code = status.code,
                "Device reported failure"
            );
            return Err(GatewayError::DeviceFailure {
                request_uuid,
                cmd,
                code: status.code,
                text: status.text,
                sub_status: status.sub_status,
            });
        }

        T::extract(response).ok_or(GatewayError::UnexpectedPayload {
            request_uuid,
            cmd,
            expected: T::DESCRIPTION,
        })
    }
}
