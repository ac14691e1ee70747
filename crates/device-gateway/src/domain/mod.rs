//! Domain types for the device gateway.
//!
//! Configuration, errors and the correlation store. Nothing here talks to
//! the bus; that lives in `crate::ipc`.

pub mod config;
pub mod error;
pub mod store;

// Re-exports for convenience
pub use config::{
    BusConfig, ConfigError, GatewayConfig, IngestionConfig, MAX_DEADLINE, StoreConfig, TimeoutConfig,
};
pub use error::{GatewayError, GatewayResult, IngestError};
pub use store::{CorrelationStore, StoreOutcome, StoreStats, StoreStatsSnapshot};
