//! # Response Messages
//!
//! Inbound messages published by device workers. A response either answers
//! a command (it carries the command's `RequestUUID`) or is an unsolicited
//! notification such as a keep-alive, in which case `RequestUUID` is absent
//! or empty.

use crate::command::Cmd;
use crate::correlation::RequestUuid;
use crate::entities::{DeviceInfo, DiscoveredDevice, NetworkConfig, VideoConfig};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome reported by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Failure,
}

/// Detailed worker status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_status: Option<String>,
}

/// Inbound message from a device worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    #[serde(rename = "Cmd")]
    pub cmd: Cmd,

    #[serde(rename = "Status")]
    pub status: Status,

    #[serde(rename = "ResponseStatus", default)]
    pub response_status: ResponseStatus,

    #[serde(
        rename = "RequestUUID",
        default,
        deserialize_with = "deserialize_request_uuid",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_uuid: Option<RequestUuid>,

    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl ResponseMessage {
    /// Successful answer to `request_uuid`.
    pub fn success(cmd: Cmd, request_uuid: RequestUuid) -> Self {
        Self {
            cmd,
            status: Status::Success,
            response_status: ResponseStatus::default(),
            request_uuid: Some(request_uuid),
            payload: ResponsePayload::default(),
        }
    }

    /// Failed answer to `request_uuid`.
    pub fn failure(
        cmd: Cmd,
        request_uuid: RequestUuid,
        code: i32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            cmd,
            status: Status::Failure,
            response_status: ResponseStatus {
                code,
                text: text.into(),
                sub_status: None,
            },
            request_uuid: Some(request_uuid),
            payload: ResponsePayload::default(),
        }
    }

    /// Unsolicited notification (no correlation identifier).
    pub fn notification(cmd: Cmd, device_info: DeviceInfo) -> Self {
        Self {
            cmd,
            status: Status::Success,
            response_status: ResponseStatus::default(),
            request_uuid: None,
            payload: ResponsePayload {
                device_info: Some(device_info),
                ..ResponsePayload::default()
            },
        }
    }

    /// Attach a typed payload.
    #[must_use]
    pub fn with_payload(mut self, payload: ResponsePayload) -> Self {
        self.payload = payload;
        self
    }

    /// Whether the worker reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Typed payload variants of a response; at most one is normally present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponsePayload {
    #[serde(rename = "NetworkConfig", default, skip_serializing_if = "Option::is_none")]
    pub network_config: Option<NetworkConfig>,

    #[serde(rename = "VideoConfig", default, skip_serializing_if = "Option::is_none")]
    pub video_config: Option<VideoConfig>,

    #[serde(rename = "DeviceList", default, skip_serializing_if = "Option::is_none")]
    pub device_list: Option<Vec<DiscoveredDevice>>,

    #[serde(rename = "DeviceInfo", default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<DeviceInfo>,
}

/// Workers send `""` or `null` for notifications; both mean "no correlation".
fn deserialize_request_uuid<'de, D>(deserializer: D) -> Result<Option<RequestUuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => RequestUuid::parse(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
