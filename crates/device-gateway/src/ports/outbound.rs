//! Outbound ports for the device gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_types::DeviceRecord;
use thiserror::Error;

/// Result of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No device with this MAC existed.
    Created,
    /// An existing device was updated in place.
    Updated,
}

/// Errors from the device persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Backend unreachable; the write may succeed later.
    #[error("device repository unavailable: {0}")]
    Unavailable(String),
    /// Backend refused the record.
    #[error("device record rejected: {0}")]
    Rejected(String),
}

/// Persistence of devices discovered through worker notifications.
///
/// Implementations must be idempotent: upserting the same record twice
/// leaves one device.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Create the device if its MAC is unknown, update it otherwise.
    async fn upsert_device_by_mac(
        &self,
        record: DeviceRecord,
    ) -> Result<UpsertOutcome, RepositoryError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source_is_current() {
        let before = Utc::now();
        let now = SystemTimeSource.now();
        assert!(now >= before);
    }
}
