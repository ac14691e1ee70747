//! # Shared Types Crate
//!
//! Wire-level types for the device command bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every JSON document that crosses the bus is
//!   defined here, so the publisher, the ingestion loop and test doubles for
//!   remote workers agree on one layout.
//! - **Forward Compatibility**: Unknown command names decode to
//!   [`Cmd::Unrecognized`] instead of failing the whole message.
//! - **Correlation**: Every outbound [`CommandEnvelope`] carries a
//!   [`RequestUuid`]; the matching [`ResponseMessage`] echoes it back.
//!
//! ## Wire Layout
//!
//! ```text
//! CommandEnvelope                      ResponseMessage
//! {                                    {
//!   "CommandID":   "cam-7f3a",           "Cmd":            "GET_NETWORK_CONFIG",
//!   "Cmd":         "GET_NETWORK_CONFIG", "Status":         "SUCCESS",
//!   "RequestUUID": "0190...",            "ResponseStatus": {"Code":0,"Text":"ok"},
//!   "EventTime":   "2024-...Z",          "RequestUUID":    "0190...",
//!   ...payload fields                    ...payload fields
//! }                                    }
//! ```

pub mod command;
pub mod correlation;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod response;

pub use command::Cmd;
pub use correlation::RequestUuid;
pub use entities::*;
pub use envelope::{CommandEnvelope, CommandPayload};
pub use errors::*;
pub use response::{ResponseMessage, ResponsePayload, ResponseStatus, Status};
