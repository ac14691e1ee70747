//! # Command Names
//!
//! The `Cmd` field shared by outbound envelopes and inbound responses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Command name carried in the `Cmd` field.
///
/// Request/reply commands are answered by a worker with a response carrying
/// the same `RequestUUID`. Notification commands (`KeepAlive`,
/// `DeviceRegister`) are sent by workers on their own initiative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cmd {
    GetNetworkConfig,
    SetNetworkConfig,
    GetVideoConfig,
    SetVideoConfig,
    ScanDevices,
    GetDeviceInfo,
    Reboot,
    /// Periodic liveness ping from a device worker.
    KeepAlive,
    /// A device announcing itself to the backend.
    DeviceRegister,
    /// Any command name this build does not know about.
    #[serde(other)]
    Unrecognized,
}

impl Cmd {
    /// Whether this command arrives unsolicited (not as an answer to a request).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self, Self::KeepAlive | Self::DeviceRegister)
    }

    /// Wire name, as it appears in the `Cmd` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetNetworkConfig => "GET_NETWORK_CONFIG",
            Self::SetNetworkConfig => "SET_NETWORK_CONFIG",
            Self::GetVideoConfig => "GET_VIDEO_CONFIG",
            Self::SetVideoConfig => "SET_VIDEO_CONFIG",
            Self::ScanDevices => "SCAN_DEVICES",
            Self::GetDeviceInfo => "GET_DEVICE_INFO",
            Self::Reboot => "REBOOT",
            Self::KeepAlive => "KEEP_ALIVE",
            Self::DeviceRegister => "DEVICE_REGISTER",
            Self::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
