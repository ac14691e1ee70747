//! # Gateway Runtime
//!
//! Runs the device gateway standalone on an in-process message bus.
//!
//! ## Startup
//!
//! 1. Logging (`GATEWAY_LOG_LEVEL`/`RUST_LOG`, `GATEWAY_JSON_LOGS`)
//! 2. Configuration: defaults overlaid with `GATEWAY_*` variables
//! 3. Wiring: bus, consumer group, device table, gateway
//! 4. Ingestion loop spawned; runs until Ctrl+C

use anyhow::{Context, Result};
use device_gateway::GatewayConfig;
use gateway_runtime::build_standalone;
use gateway_runtime::telemetry::{init_logging, TelemetryConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging(&TelemetryConfig::from_env())?;

    // Load configuration
    let config = GatewayConfig::from_env().context("loading gateway configuration")?;
    config.validate().context("validating gateway configuration")?;

    info!(
        command_topic = %config.bus.command_topic,
        response_topic = %config.bus.response_topic,
        consumer_group = %config.bus.consumer_group,
        capacity = config.store.capacity,
        poll_interval_ms = config.timeouts.poll_interval.as_millis() as u64,
        "Configuration loaded"
    );

    let mut standalone = build_standalone(config)?;
    standalone.gateway.start();

    // Keep the gateway running
    info!("Device gateway is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    standalone.gateway.shutdown().await;

    let store = standalone.gateway.store().stats().snapshot();
    let ingestion = standalone.gateway.ingestion_stats().snapshot();
    info!(
        received = ingestion.received,
        stored = ingestion.stored,
        dropped_busy = ingestion.dropped_busy,
        decode_failures = ingestion.decode_failures,
        loaded = store.loaded,
        unclaimed = standalone.gateway.store().count(),
        known_devices = standalone.repository.len(),
        "Final statistics"
    );

    Ok(())
}
