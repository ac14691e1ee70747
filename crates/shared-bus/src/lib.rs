//! # Shared Bus - Message Bus Port for Device Workers
//!
//! Device workers (ONVIF/vendor SDK bridges) are never called directly.
//! Commands go out on a topic; answers and notifications come back on
//! another, and the API process pulls them through a consumer group.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐  publish(topic)   ┌──────────────┐   consume(group)  ┌──────────────┐
//! │ API process  │ ───────────────→  │ Message Bus  │ ────────────────→ │ Device worker│
//! │              │ ←──────────────── │              │ ←──────────────── │              │
//! └──────────────┘  consume(group)   └──────────────┘   publish(topic)  └──────────────┘
//! ```
//!
//! - **At-least-once**: consumers must tolerate redelivery.
//! - **Unordered**: no ordering across partitions or topics.
//! - **Opaque payloads**: the bus moves strings; decoding is the caller's job.
//!
//! [`MessageBus`] is the port; [`InMemoryMessageBus`] is a single-process
//! implementation for tests and standalone runs. Production transports
//! (Kafka, NATS, ...) implement the same trait outside this workspace.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BusError, BusMessage};
pub use publisher::{InMemoryMessageBus, MessageBus};
pub use subscriber::ConsumerGroup;

/// Maximum messages to buffer per consumer group before the oldest are lost.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Topic carrying command envelopes to device workers.
pub const COMMAND_TOPIC: &str = "device.commands";

/// Topic carrying responses and notifications from device workers.
pub const RESPONSE_TOPIC: &str = "device.responses";
