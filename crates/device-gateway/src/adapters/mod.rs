//! Adapters implementing the outbound ports.

pub mod device_repository;

pub use device_repository::InMemoryDeviceRepository;
