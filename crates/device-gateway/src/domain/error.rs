//! Gateway error types.
//!
//! `GatewayError` is what a request handler sees. `IngestError` never
//! leaves the ingestion loop: it is logged and the message is dropped.

use shared_bus::BusError;
use shared_types::{Cmd, RequestUuid};
use std::time::Duration;
use thiserror::Error;

/// HTTP status codes handlers translate gateway errors into.
pub mod status_codes {
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    pub const BAD_GATEWAY: u16 = 502;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
    pub const GATEWAY_TIMEOUT: u16 = 504;
}

/// Errors returned to the caller of a device command.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response arrived before the deadline.
    #[error("no response for {request_uuid} within {waited:?}")]
    Timeout {
        request_uuid: RequestUuid,
        waited: Duration,
    },

    /// The worker answered with `Status=FAILURE`.
    #[error("device reported failure for {cmd} ({request_uuid}): [{code}] {text}")]
    DeviceFailure {
        request_uuid: RequestUuid,
        cmd: Cmd,
        code: i32,
        text: String,
        sub_status: Option<String>,
    },

    /// The command never reached the bus; nothing is waited for.
    #[error("failed to publish {cmd} ({request_uuid}): {source}")]
    Publish {
        request_uuid: RequestUuid,
        cmd: Cmd,
        #[source]
        source: BusError,
    },

    /// The envelope could not be serialised.
    #[error("failed to encode command envelope: {0}")]
    Encode(#[from] serde_json::Error),

    /// A SUCCESS response without the payload the command implies.
    #[error("{cmd} response for {request_uuid} carried no {expected}")]
    UnexpectedPayload {
        request_uuid: RequestUuid,
        cmd: Cmd,
        expected: &'static str,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether this is a deadline expiry rather than a domain error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Correlation identifier of the request, when one was minted.
    pub fn request_uuid(&self) -> Option<RequestUuid> {
        match self {
            Self::Timeout { request_uuid, .. }
            | Self::DeviceFailure { request_uuid, .. }
            | Self::Publish { request_uuid, .. }
            | Self::UnexpectedPayload { request_uuid, .. } => Some(*request_uuid),
            Self::Encode(_) | Self::Config(_) => None,
        }
    }

    /// HTTP status a REST handler should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Timeout { .. } => status_codes::GATEWAY_TIMEOUT,
            Self::DeviceFailure { .. } | Self::UnexpectedPayload { .. } => {
                status_codes::BAD_GATEWAY
            }
            Self::Publish { .. } => status_codes::SERVICE_UNAVAILABLE,
            Self::Encode(_) | Self::Config(_) => status_codes::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<super::config::ConfigError> for GatewayError {
    fn from(err: super::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Reasons the ingestion loop drops an inbound message.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Not a valid `ResponseMessage`.
    #[error("malformed response message: {0}")]
    Decode(#[from] serde_json::Error),

    /// Store full; the response is dropped and its waiter will time out.
    #[error("correlation store at capacity ({capacity}), dropping response {request_uuid}")]
    CapacityExceeded {
        request_uuid: RequestUuid,
        capacity: usize,
    },
}

/// Result alias for device commands.
pub type GatewayResult<T> = Result<T, GatewayError>;
