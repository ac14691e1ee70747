//! # Command Envelope
//!
//! The outbound message describing one device operation for a remote worker.
//!
//! ## Correlation
//!
//! The `RequestUUID` is chosen by the caller before publishing and echoed
//! unchanged by the worker in its [`ResponseMessage`](crate::ResponseMessage).
//! An envelope is never mutated after it has been published.

use crate::command::Cmd;
use crate::correlation::RequestUuid;
use crate::entities::{NetworkConfig, ScanRequest, VideoConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound command envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Target device (or device model) the worker should act on.
    #[serde(rename = "CommandID")]
    pub command_id: String,

    /// Operation to perform.
    #[serde(rename = "Cmd")]
    pub cmd: Cmd,

    /// Correlation identifier echoed by the response.
    #[serde(rename = "RequestUUID")]
    pub request_uuid: RequestUuid,

    /// When the command was issued.
    #[serde(rename = "EventTime")]
    pub event_time: DateTime<Utc>,

    /// Command-specific fields; absent ones are omitted on the wire.
    #[serde(flatten)]
    pub payload: CommandPayload,
}

impl CommandEnvelope {
    /// Create an envelope with an empty payload.
    pub fn new(
        request_uuid: RequestUuid,
        command_id: impl Into<String>,
        cmd: Cmd,
        event_time: DateTime<Utc>,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            cmd,
            request_uuid,
            event_time,
            payload: CommandPayload::default(),
        }
    }

    /// Attach command-specific fields.
    #[must_use]
    pub fn with_payload(mut self, payload: CommandPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Command-specific envelope fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandPayload {
    #[serde(rename = "NetworkConfig", default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,

    #[serde(rename = "VideoConfig", default, skip_serializing_if = "Option::is_none")]
    pub video_config: Option<VideoConfig>,

    #[serde(rename = "Scan", default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanRequest>,

    /// Video channel addressed by channel-scoped reads.
    #[serde(rename = "Channel", default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
}

impl CommandPayload {
    /// Payload for `SET_NETWORK_CONFIG`.
    pub fn network(config: NetworkConfig) -> Self {
        Self {
            network_config: Some(config),
            ..Self::default()
        }
    }

    /// Payload for `SET_VIDEO_CONFIG`.
    pub fn video(config: VideoConfig) -> Self {
        Self {
            video_config: Some(config),
            ..Self::default()
        }
    }

    /// Payload for `SCAN_DEVICES`.
    pub fn scan(request: ScanRequest) -> Self {
        Self {
            scan: Some(request),
            ..Self::default()
        }
    }

    /// Payload for channel-scoped reads such as `GET_VIDEO_CONFIG`.
    pub fn channel(channel: u32) -> Self {
        Self {
            channel: Some(channel),
            ..Self::default()
        }
    }
}
