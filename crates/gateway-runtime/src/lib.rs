//! Gateway Runtime - standalone wiring of the device gateway.
//!
//! The binary in `main.rs` is a thin shell around [`build_standalone`] and
//! [`telemetry::init_logging`]; both live here so they can be tested.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod telemetry;

use device_gateway::{DeviceGateway, GatewayConfig, GatewayError, InMemoryDeviceRepository};
use shared_bus::InMemoryMessageBus;
use std::sync::Arc;
use tracing::info;

/// Gateway wired to an in-process bus and device table.
pub struct Standalone {
    pub gateway: DeviceGateway,
    pub bus: Arc<InMemoryMessageBus>,
    pub repository: Arc<InMemoryDeviceRepository>,
}

/// Build a gateway on an in-memory bus.
///
/// The ingestion consumer group is registered before the gateway exists,
/// so no response published after this returns is missed.
pub fn build_standalone(config: GatewayConfig) -> Result<Standalone, GatewayError> {
    let bus = Arc::new(InMemoryMessageBus::new());
    bus.register_consumer_group(&config.bus.consumer_group, &[config.bus.response_topic.as_str()]);
    let repository = Arc::new(InMemoryDeviceRepository::new());

    let gateway = DeviceGateway::new(config, bus.clone(), repository.clone())?;
    info!(
        bus_capacity = bus.capacity(),
        consumer_groups = bus.consumer_group_count(),
        "Standalone gateway wired"
    );

    Ok(Standalone {
        gateway,
        bus,
        repository,
    })
}
