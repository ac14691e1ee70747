//! # Device Entities
//!
//! Payload shapes carried inside envelopes and responses, plus the device
//! record maintained from worker notifications.
//!
//! Only the fields the gateway itself reasons about are modelled; vendor
//! specific layouts stay opaque to this crate.

use crate::errors::MacAddressError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// DEVICE IDENTITY
// =============================================================================

/// Stable device identifier.
///
/// Accepts `aa:bb:cc:dd:ee:ff`, `AA-BB-CC-DD-EE-FF` and `aabbccddeeff`;
/// always renders as upper-case, colon separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Build from raw octets.
    #[must_use]
    pub fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets.
    #[must_use]
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut nibbles = Vec::with_capacity(12);
        for c in s.trim().chars() {
            match c {
                ':' | '-' | '.' => continue,
                _ => {
                    let value = c.to_digit(16).ok_or_else(|| MacAddressError::InvalidCharacter {
                        input: s.to_string(),
                        found: c,
                    })?;
                    nibbles.push(value as u8);
                }
            }
        }

        if nibbles.len() != 12 {
            return Err(MacAddressError::WrongLength {
                input: s.to_string(),
                digits: nibbles.len(),
            });
        }

        let mut octets = [0u8; 6];
        for (octet, pair) in octets.iter_mut().zip(nibbles.chunks_exact(2)) {
            *octet = (pair[0] << 4) | pair[1];
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = MacAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

// =============================================================================
// COMMAND / RESPONSE PAYLOADS
// =============================================================================

/// Network settings of a device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfig {
    pub ip_address: String,
    pub netmask: String,
    pub gateway: String,
    #[serde(default)]
    pub dns: Vec<String>,
    #[serde(default)]
    pub dhcp: bool,
}

/// Encoder settings of one video channel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VideoConfig {
    pub channel: u32,
    pub resolution: String,
    pub frame_rate: u32,
    pub bitrate_kbps: u32,
    pub codec: String,
}

/// Parameters of a LAN discovery sweep executed by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRequest {
    /// CIDR ranges to sweep, e.g. `192.168.1.0/24`.
    pub subnets: Vec<String>,
    /// Per-host probe timeout on the worker side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_ms: Option<u32>,
}

/// One device found by a discovery sweep.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoveredDevice {
    pub ip: String,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub onvif_port: Option<u16>,
}

/// Self-description sent by a device worker (registration, keep-alive,
/// `GET_DEVICE_INFO`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceInfo {
    /// MAC as reported; normalised by [`MacAddress`] on ingestion.
    pub mac: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub firmware: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
}

// =============================================================================
// PERSISTED DEVICE RECORD
// =============================================================================

/// Device row maintained from unsolicited worker notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: MacAddress,
    pub ip: Option<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
    pub serial: Option<String>,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
}

impl DeviceRecord {
    /// Build a record from a worker's self-description.
    pub fn from_info(info: &DeviceInfo, seen_at: DateTime<Utc>) -> Result<Self, MacAddressError> {
        Ok(Self {
            mac: info.mac.parse()?,
            ip: info.ip.clone(),
            model: info.model.clone(),
            firmware: info.firmware.clone(),
            serial: info.serial.clone(),
            online: true,
            last_seen: seen_at,
        })
    }

    /// Fold a newer observation into an existing record.
    ///
    /// Fields absent from `newer` keep their stored value, so a bare
    /// keep-alive never erases what a registration recorded.
    pub fn merge_from(&mut self, newer: DeviceRecord) {
        if newer.ip.is_some() {
            self.ip = newer.ip;
        }
        if newer.model.is_some() {
            self.model = newer.model;
        }
        if newer.firmware.is_some() {
            self.firmware = newer.firmware;
        }
        if newer.serial.is_some() {
            self.serial = newer.serial;
        }
        self.online = newer.online;
        if newer.last_seen > self.last_seen {
            self.last_seen = newer.last_seen;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_normalisation() {
        let expected = "AA:BB:CC:0D:0E:0F";
        for input in ["aa:bb:cc:0d:0e:0f", "AA-BB-CC-0D-0E-0F", "aabbcc0d0e0f", " aabb.cc0d.0e0f "] {
            let mac: MacAddress = input.parse().unwrap();
            assert_eq!(mac.to_string(), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_mac_rejects_garbage() {
        assert!(matches!(
            "aa:bb:cc".parse::<MacAddress>(),
            Err(MacAddressError::WrongLength { digits: 6, .. })
        ));
        assert!(matches!(
            "zz:bb:cc:dd:ee:ff".parse::<MacAddress>(),
            Err(MacAddressError::InvalidCharacter { found: 'z', .. })
        ));
    }

    #[test]
    fn test_mac_serde_uses_normalised_string() {
        let mac: MacAddress = serde_json::from_str("\"aa-bb-cc-dd-ee-ff\"").unwrap();
        assert_eq!(serde_json::to_string(&mac).unwrap(), "\"AA:BB:CC:DD:EE:FF\"");
    }

    #[test]
    fn test_merge_keeps_known_fields() {
        let t0 = Utc::now();
        let mut stored = DeviceRecord::from_info(
            &DeviceInfo {
                mac: "aa:bb:cc:dd:ee:ff".into(),
                ip: Some("10.0.0.5".into()),
                model: Some("DS-2CD2143".into()),
                firmware: Some("V5.7.3".into()),
                serial: None,
            },
            t0,
        )
        .unwrap();

        let ping = DeviceRecord::from_info(
            &DeviceInfo {
                mac: "AABBCCDDEEFF".into(),
                ..DeviceInfo::default()
            },
            t0 + chrono::Duration::seconds(30),
        )
        .unwrap();

        stored.merge_from(ping);
        assert_eq!(stored.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(stored.model.as_deref(), Some("DS-2CD2143"));
        assert_eq!(stored.last_seen, t0 + chrono::Duration::seconds(30));
        assert!(stored.online);
    }
}
