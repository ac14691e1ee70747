//! Ports (hexagonal boundaries) for the device gateway.

pub mod outbound;

pub use outbound::{
    DeviceRepository, RepositoryError, SystemTimeSource, TimeSource, UpsertOutcome,
};
