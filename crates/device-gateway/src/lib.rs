//! Device Gateway - request/response calls to device workers over a bus.
//!
//! Recording devices (IP cameras, NVRs) are driven by remote workers that
//! only speak through a message bus: at-least-once, unordered, no replies
//! on the same channel. This crate turns that into "call and get an
//! answer within a deadline" for any number of concurrent handlers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         DEVICE GATEWAY                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  request handlers                                                │
//! │        │                                                         │
//! │  ┌─────┴────────────────┐                                        │
//! │  │ DeviceCommandService │  mint RequestUuid → publish → await    │
//! │  └──┬────────────────┬──┘                                        │
//! │     │                │                                           │
//! │  ┌──┴────────┐  ┌────┴───┐   load()   ┌──────────────────┐       │
//! │  │ Publisher │  │ Waiter │ ─────────→ │ CorrelationStore │       │
//! │  └──┬────────┘  └────────┘ ←─notify── │  (bounded, Nmax) │       │
//! │     │                                 └────────┬─────────┘       │
//! │     │                                  admit() │                 │
//! │     │                                 ┌────────┴─────────┐       │
//! │     │                                 │  IngestionLoop   │       │
//! │     │                                 └──┬──────────┬────┘       │
//! │     │                 notifications      │          │            │
//! │     │          ┌───────────────┐ ←───────┘          │            │
//! │     │          │ CommandRouter │ → DeviceRepository │            │
//! │     │          └───────────────┘                    │            │
//! └─────┼───────────────────────────────────────────────┼────────────┘
//!       ▼ device.commands               device.responses ▲
//!                    Message Bus ←→ device workers
//! ```
//!
//! # Guarantees
//!
//! - A response is consumed at most once (`load` removes it).
//! - The store never holds more than its capacity; a new response that
//!   arrives while it is full is dropped and its waiter times out.
//! - A timeout is reported as [`GatewayError::Timeout`], never confused
//!   with a device-side failure.
//!
//! # Usage
//!
//! ```ignore
//! use device_gateway::{DeviceGateway, GatewayConfig, InMemoryDeviceRepository};
//!
//! let mut gateway = DeviceGateway::new(GatewayConfig::default(), bus, repository)?;
//! gateway.start();
//! let info = gateway.commands().get_device_info("cam-12").await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod gateway;
pub mod ipc;
pub mod ports;
pub mod service;

// Re-exports for public API
pub use adapters::InMemoryDeviceRepository;
pub use domain::{
    ConfigError, CorrelationStore, GatewayConfig, GatewayError, GatewayResult, IngestError,
    StoreOutcome, StoreStatsSnapshot,
};
pub use gateway::DeviceGateway;
pub use ipc::{
    Acknowledged, CommandPublisher, CommandRouter, ExpectedPayload, IngestOutcome, IngestionLoop,
    IngestionStatsSnapshot, RouteOutcome, Waiter,
};
pub use ports::{DeviceRepository, RepositoryError, SystemTimeSource, TimeSource, UpsertOutcome};
pub use service::DeviceCommandService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
