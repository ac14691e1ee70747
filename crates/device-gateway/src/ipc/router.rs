//! Command router for unsolicited worker notifications.
//!
//! `KEEP_ALIVE` and `DEVICE_REGISTER` keep the device table current.
//! Everything else is either an answer (the waiter's business) or a
//! command this build does not know, and is ignored.

use crate::ports::{DeviceRepository, TimeSource, UpsertOutcome};
use shared_types::{Cmd, DeviceRecord, ResponseMessage};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Device table updated.
    Upserted(UpsertOutcome),
    /// Nothing to do for this message.
    Ignored,
    /// The repository refused or was unreachable; logged.
    Failed,
}

/// Dispatches ingested messages on `Cmd`.
pub struct CommandRouter {
    repository: Arc<dyn DeviceRepository>,
    clock: Arc<dyn TimeSource>,
}

impl CommandRouter {
    pub fn new(repository: Arc<dyn DeviceRepository>, clock: Arc<dyn TimeSource>) -> Self {
        Self { repository, clock }
    }

    /// Apply the side effects of `message`, if any. Never fails.
    pub async fn route(&self, message: &ResponseMessage) -> RouteOutcome {
        match message.cmd {
            Cmd::KeepAlive | Cmd::DeviceRegister => self.upsert_device(message).await,
            Cmd::Unrecognized => {
                debug!(request_uuid = ?message.request_uuid, "Ignoring unrecognized command");
                RouteOutcome::Ignored
            }
            _ => RouteOutcome::Ignored,
        }
    }

    async fn upsert_device(&self, message: &ResponseMessage) -> RouteOutcome {
        let Some(info) = message.payload.device_info.as_ref() else {
            warn!(cmd = %message.cmd, "Notification without DeviceInfo, ignoring");
            return RouteOutcome::Ignored;
        };

        let mut record = match DeviceRecord::from_info(info, self.clock.now()) {
            Ok(record) => record,
            Err(e) => {
                warn!(cmd = %message.cmd, error = %e, "Notification with invalid MAC, ignoring");
                return RouteOutcome::Ignored;
            }
        };
        // A worker reporting FAILURE for its device means it cannot reach it
        record.online = message.is_success();
        let mac = record.mac;

        match self.repository.upsert_device_by_mac(record).await {
            Ok(outcome) => {
                debug!(cmd = %message.cmd, mac = %mac, outcome = ?outcome, "Device state recorded");
                RouteOutcome::Upserted(outcome)
            }
            Err(e) => {
                error!(cmd = %message.cmd, mac = %mac, error = %e, "Device upsert failed");
                RouteOutcome::Failed
            }
        }
    }
}
