//! Gateway configuration with validation.
//!
//! Every section is `#[serde(default)]`, so a partial JSON document (or an
//! empty one) yields a usable configuration. Durations are written the
//! human way: `"10s"`, `"500ms"`, `"2m"`.

use serde::{Deserialize, Serialize};
use shared_bus::{COMMAND_TOPIC, RESPONSE_TOPIC};
use shared_types::Cmd;
use std::time::Duration;

/// Upper bound for any per-operation deadline.
pub const MAX_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Message bus topics and consumer group
    pub bus: BusConfig,
    /// Correlation store sizing
    pub store: StoreConfig,
    /// Per-operation deadlines and the waiter poll interval
    pub timeouts: TimeoutConfig,
    /// Response ingestion loop behaviour
    pub ingestion: IngestionConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.command_topic.trim().is_empty() || self.bus.response_topic.trim().is_empty() {
            return Err(ConfigError::InvalidBus("topics cannot be empty".into()));
        }

        // Commands must never be consumed back as responses
        if self.bus.command_topic == self.bus.response_topic {
            return Err(ConfigError::InvalidBus(
                "command and response topics must differ".into(),
            ));
        }

        if self.bus.consumer_group.trim().is_empty() {
            return Err(ConfigError::InvalidBus(
                "consumer_group cannot be empty".into(),
            ));
        }

        if self.store.capacity == 0 {
            return Err(ConfigError::InvalidStore("capacity cannot be 0".into()));
        }

        for (name, deadline) in self.timeouts.deadlines() {
            if deadline.is_zero() {
                return Err(ConfigError::InvalidTimeout(format!("{name} cannot be 0")));
            }
            if deadline > MAX_DEADLINE {
                return Err(ConfigError::InvalidTimeout(format!(
                    "{name} cannot exceed {}s",
                    MAX_DEADLINE.as_secs()
                )));
            }
        }

        if self.timeouts.poll_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "poll_interval cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Defaults overlaid with `GATEWAY_*` environment variables.
    ///
    /// Recognised variables:
    /// - `GATEWAY_COMMAND_TOPIC`, `GATEWAY_RESPONSE_TOPIC`, `GATEWAY_CONSUMER_GROUP`
    /// - `GATEWAY_STORE_CAPACITY`, `GATEWAY_REDELIVERY_WINDOW`
    /// - `GATEWAY_DEFAULT_TIMEOUT`, `GATEWAY_POLL_INTERVAL`
    /// - `GATEWAY_INGEST_BACKOFF`
    ///
    /// Values that fail to parse are reported rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(topic) = lookup("GATEWAY_COMMAND_TOPIC") {
            config.bus.command_topic = topic;
        }
        if let Some(topic) = lookup("GATEWAY_RESPONSE_TOPIC") {
            config.bus.response_topic = topic;
        }
        if let Some(group) = lookup("GATEWAY_CONSUMER_GROUP") {
            config.bus.consumer_group = group;
        }
        if let Some(raw) = lookup("GATEWAY_STORE_CAPACITY") {
            config.store.capacity = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "GATEWAY_STORE_CAPACITY",
                value: raw.clone(),
            })?;
        }

        let durations: [(&'static str, &mut Duration); 4] = [
            ("GATEWAY_REDELIVERY_WINDOW", &mut config.store.redelivery_window),
            ("GATEWAY_DEFAULT_TIMEOUT", &mut config.timeouts.default),
            ("GATEWAY_POLL_INTERVAL", &mut config.timeouts.poll_interval),
            ("GATEWAY_INGEST_BACKOFF", &mut config.ingestion.error_backoff),
        ];
        for (key, slot) in durations {
            if let Some(raw) = lookup(key) {
                *slot = humantime_serde::parse_duration(&raw)
                    .map_err(|_| ConfigError::InvalidValue { key, value: raw })?;
            }
        }

        Ok(config)
    }
}

/// Message bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Topic command envelopes are published to
    pub command_topic: String,
    /// Topic responses and notifications arrive on
    pub response_topic: String,
    /// Consumer group the ingestion loop pulls with
    pub consumer_group: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            command_topic: COMMAND_TOPIC.to_string(),
            response_topic: RESPONSE_TOPIC.to_string(),
            consumer_group: "device-gateway".to_string(),
        }
    }
}

/// Correlation store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of unclaimed responses held at once
    pub capacity: usize,
    /// How long a consumed key is remembered to drop bus redeliveries
    #[serde(with = "humantime_serde")]
    pub redelivery_window: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            redelivery_window: Duration::from_secs(120),
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for raw requests without a dedicated setting
    #[serde(with = "humantime_serde")]
    pub default: Duration,
    /// GET/SET_NETWORK_CONFIG
    #[serde(with = "humantime_serde")]
    pub network_config: Duration,
    /// GET/SET_VIDEO_CONFIG
    #[serde(with = "humantime_serde")]
    pub video_config: Duration,
    /// SCAN_DEVICES (probes whole subnets, so much longer)
    #[serde(with = "humantime_serde")]
    pub device_scan: Duration,
    /// GET_DEVICE_INFO
    #[serde(with = "humantime_serde")]
    pub device_info: Duration,
    /// REBOOT
    #[serde(with = "humantime_serde")]
    pub reboot: Duration,
    /// Fallback re-check period while a waiter is pending
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(10),
            network_config: Duration::from_secs(10),
            video_config: Duration::from_secs(10),
            device_scan: Duration::from_secs(120),
            device_info: Duration::from_secs(5),
            reboot: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl TimeoutConfig {
    /// Deadline for a command.
    pub fn for_cmd(&self, cmd: Cmd) -> Duration {
        match cmd {
            Cmd::GetNetworkConfig | Cmd::SetNetworkConfig => self.network_config,
            Cmd::GetVideoConfig | Cmd::SetVideoConfig => self.video_config,
            Cmd::ScanDevices => self.device_scan,
            Cmd::GetDeviceInfo => self.device_info,
            Cmd::Reboot => self.reboot,
            _ => self.default,
        }
    }

    /// Every deadline with its field name.
    pub fn deadlines(&self) -> [(&'static str, Duration); 6] {
        [
            ("default", self.default),
            ("network_config", self.network_config),
            ("video_config", self.video_config),
            ("device_scan", self.device_scan),
            ("device_info", self.device_info),
            ("reboot", self.reboot),
        ]
    }
}

/// Ingestion loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Pause after a transient bus error before consuming again
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid bus topic or consumer group
    #[error("invalid bus configuration: {0}")]
    InvalidBus(String),
    /// Invalid store sizing
    #[error("invalid store configuration: {0}")]
    InvalidStore(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Environment override that does not parse
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before 's', otherwise "500ms" reads as "500m" seconds
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
