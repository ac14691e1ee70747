//! Device command service - the API request handlers call.
//!
//! Every operation is the same three steps: mint a `RequestUuid`, publish
//! the envelope, wait for the typed answer under the operation's deadline.

use crate::domain::{GatewayError, TimeoutConfig};
use crate::ipc::{Acknowledged, CommandPublisher, ExpectedPayload, Waiter};
use shared_types::{
    Cmd, CommandPayload, DeviceInfo, DiscoveredDevice, NetworkConfig, RequestUuid,
    ResponseMessage, ScanRequest, VideoConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Typed request/response calls to device workers.
///
/// Cheap to clone; hand one to every request handler.
#[derive(Clone)]
pub struct DeviceCommandService {
    publisher: Arc<CommandPublisher>,
    waiter: Waiter,
    timeouts: Arc<TimeoutConfig>,
}

impl DeviceCommandService {
    pub fn new(publisher: Arc<CommandPublisher>, waiter: Waiter, timeouts: TimeoutConfig) -> Self {
        Self {
            publisher,
            waiter,
            timeouts: Arc::new(timeouts),
        }
    }

    pub async fn get_network_config(&self, device: &str) -> Result<NetworkConfig, GatewayError> {
        self.request(device, Cmd::GetNetworkConfig, CommandPayload::default())
            .await
    }

    pub async fn set_network_config(
        &self,
        device: &str,
        config: NetworkConfig,
    ) -> Result<(), GatewayError> {
        self.request::<Acknowledged>(device, Cmd::SetNetworkConfig, CommandPayload::network(config))
            .await
            .map(|_| ())
    }

    /// Encoder settings of one channel.
    pub async fn get_video_config(
        &self,
        device: &str,
        channel: u32,
    ) -> Result<VideoConfig, GatewayError> {
        self.request(device, Cmd::GetVideoConfig, CommandPayload::channel(channel))
            .await
    }

    pub async fn set_video_config(
        &self,
        device: &str,
        config: VideoConfig,
    ) -> Result<(), GatewayError> {
        self.request::<Acknowledged>(device, Cmd::SetVideoConfig, CommandPayload::video(config))
            .await
            .map(|_| ())
    }

    /// LAN discovery sweep run by `worker`.
    pub async fn scan_devices(
        &self,
        worker: &str,
        scan: ScanRequest,
    ) -> Result<Vec<DiscoveredDevice>, GatewayError> {
        self.request(worker, Cmd::ScanDevices, CommandPayload::scan(scan))
            .await
    }

    pub async fn get_device_info(&self, device: &str) -> Result<DeviceInfo, GatewayError> {
        self.request(device, Cmd::GetDeviceInfo, CommandPayload::default())
            .await
    }

    pub async fn reboot(&self, device: &str) -> Result<(), GatewayError> {
        self.request::<Acknowledged>(device, Cmd::Reboot, CommandPayload::default())
            .await
            .map(|_| ())
    }

    /// Publish any command and return the raw response, SUCCESS or not.
    ///
    /// For callers with payloads this crate has no typed accessor for.
    pub async fn request_raw(
        &self,
        command_id: &str,
        cmd: Cmd,
        payload: CommandPayload,
        deadline: Duration,
    ) -> Result<ResponseMessage, GatewayError> {
        let request_uuid = RequestUuid::new();
        self.publisher
            .publish(request_uuid, command_id, cmd, payload)
            .await?;
        self.waiter.wait(request_uuid, deadline).await
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    async fn request<T: ExpectedPayload>(
        &self,
        command_id: &str,
        cmd: Cmd,
        payload: CommandPayload,
    ) -> Result<T, GatewayError> {
        let request_uuid = RequestUuid::new();
        let deadline = self.timeouts.for_cmd(cmd);

        self.publisher
            .publish(request_uuid, command_id, cmd, payload)
            .await?;
        debug!(
            request_uuid = %request_uuid,
            cmd = %cmd,
            deadline_ms = deadline.as_millis() as u64,
            "Awaiting device response"
        );

        self.waiter.await_payload(request_uuid, deadline).await
    }
}
