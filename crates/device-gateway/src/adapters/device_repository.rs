//! In-memory device repository.
//!
//! Stands in for the relational device table in tests and standalone
//! runs. Keyed by normalised MAC, so `aa-bb-..` and `AA:BB:..` are the
//! same device.

use crate::ports::{DeviceRepository, RepositoryError, UpsertOutcome};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{DeviceRecord, MacAddress};
use tracing::debug;

/// DashMap-backed [`DeviceRepository`].
#[derive(Debug, Default)]
pub struct InMemoryDeviceRepository {
    devices: DashMap<MacAddress, DeviceRecord>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record for `mac`, if any.
    pub fn get(&self, mac: &MacAddress) -> Option<DeviceRecord> {
        self.devices.get(mac).map(|r| r.value().clone())
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn upsert_device_by_mac(
        &self,
        record: DeviceRecord,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mac = record.mac;
        let outcome = match self.devices.entry(mac) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().merge_from(record);
                UpsertOutcome::Updated
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                UpsertOutcome::Created
            }
        };
        debug!(mac = %mac, outcome = ?outcome, "Device upserted");
        Ok(outcome)
    }
}
