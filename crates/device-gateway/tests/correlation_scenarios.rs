//! # Correlation Integration Tests
//!
//! End-to-end runs through the in-memory bus:
//!
//! 1. Handler calls `DeviceCommandService`, which publishes an envelope
//! 2. A fake worker consumes it and publishes a `ResponseMessage`
//! 3. The ingestion loop stores the response
//! 4. The handler's waiter consumes it

use std::sync::Arc;
use std::time::Duration;

use device_gateway::{
    CorrelationStore, DeviceGateway, GatewayConfig, GatewayError, InMemoryDeviceRepository,
    Waiter,
};
use shared_bus::{InMemoryMessageBus, MessageBus, COMMAND_TOPIC, RESPONSE_TOPIC};
use shared_types::{
    Cmd, CommandEnvelope, DeviceInfo, DiscoveredDevice, MacAddress, RequestUuid,
    ResponseMessage, ResponsePayload, ScanRequest, VideoConfig,
};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.timeouts.default = Duration::from_secs(2);
    config.timeouts.network_config = Duration::from_secs(2);
    config.timeouts.video_config = Duration::from_secs(2);
    config.timeouts.device_scan = Duration::from_secs(2);
    config.timeouts.device_info = Duration::from_millis(300);
    config.timeouts.reboot = Duration::from_secs(2);
    config.timeouts.poll_interval = Duration::from_millis(50);
    config.ingestion.error_backoff = Duration::from_millis(10);
    config
}

struct Harness {
    gateway: DeviceGateway,
    bus: Arc<InMemoryMessageBus>,
    repository: Arc<InMemoryDeviceRepository>,
}

fn start(config: GatewayConfig) -> Harness {
    let bus = Arc::new(InMemoryMessageBus::new());
    bus.register_consumer_group(&config.bus.consumer_group, &[RESPONSE_TOPIC]);
    let repository = Arc::new(InMemoryDeviceRepository::new());

    let mut gateway = DeviceGateway::new(config, bus.clone(), repository.clone())
        .expect("valid config");
    gateway.start();

    Harness {
        gateway,
        bus,
        repository,
    }
}

/// Fake device worker: answers each command with whatever `respond` returns.
fn spawn_worker<F>(bus: Arc<InMemoryMessageBus>, respond: F) -> JoinHandle<()>
where
    F: Fn(CommandEnvelope) -> Option<ResponseMessage> + Send + 'static,
{
    bus.register_consumer_group("worker", &[COMMAND_TOPIC]);
    tokio::spawn(async move {
        while let Ok(message) = bus.consume("worker").await {
            let envelope: CommandEnvelope =
                serde_json::from_str(&message.payload).expect("valid envelope");
            if let Some(response) = respond(envelope) {
                let body = serde_json::to_string(&response).expect("encodable");
                bus.publish(RESPONSE_TOPIC, body).await.expect("published");
            }
        }
    })
}

async fn publish_response(bus: &InMemoryMessageBus, response: &ResponseMessage) {
    let body = serde_json::to_string(response).expect("encodable");
    bus.publish(RESPONSE_TOPIC, body).await.expect("published");
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached");
}

fn camera_info() -> DeviceInfo {
    DeviceInfo {
        mac: "bc:ad:28:11:22:33".into(),
        ip: Some("192.168.1.64".into()),
        model: Some("DS-2CD2143".into()),
        firmware: Some("V5.7.3".into()),
        serial: Some("DS-2CD2143G2-I20230101".into()),
    }
}

/// The worker answers before the deadline; the typed payload comes back.
#[tokio::test]
async fn test_answer_before_deadline() {
    // Arrange
    let harness = start(test_config());
    let _worker = spawn_worker(harness.bus.clone(), |envelope| {
        assert_eq!(envelope.cmd, Cmd::GetDeviceInfo);
        assert_eq!(envelope.command_id, "cam-12");
        Some(
            ResponseMessage::success(envelope.cmd, envelope.request_uuid).with_payload(
                ResponsePayload {
                    device_info: Some(camera_info()),
                    ..ResponsePayload::default()
                },
            ),
        )
    });

    // Act
    let info = harness
        .gateway
        .commands()
        .get_device_info("cam-12")
        .await
        .expect("device info");

    // Assert
    assert_eq!(info, camera_info());
    assert_eq!(harness.gateway.store().count(), 0);
}

/// Nobody answers; the call times out shortly after its deadline.
#[tokio::test]
async fn test_no_answer_times_out() {
    let harness = start(test_config());
    // Worker swallows everything
    let _worker = spawn_worker(harness.bus.clone(), |_| None);

    let started = Instant::now();
    let err = harness
        .gateway
        .commands()
        .get_device_info("cam-12")
        .await
        .expect_err("no response");

    assert!(err.is_timeout(), "got {err:?}");
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300));
    // Deadline plus at most one poll interval and scheduling slack
    assert!(elapsed < Duration::from_millis(300 + 50 + 250), "took {elapsed:?}");
}

/// A response arriving at a full store is dropped; stored ones are kept.
#[tokio::test]
async fn test_full_store_drops_extra_response() {
    let mut config = test_config();
    config.store.capacity = 2;
    let harness = start(config);
    let ids: Vec<_> = (0..3).map(|_| RequestUuid::new()).collect();

    for id in &ids {
        publish_response(&harness.bus, &ResponseMessage::success(Cmd::Reboot, *id)).await;
    }

    let stats = harness.gateway.ingestion_stats();
    wait_until(|| stats.snapshot().received == 3).await;

    let store = harness.gateway.store();
    assert_eq!(store.count(), 2);
    assert!(store.contains(&ids[0]));
    assert!(store.contains(&ids[1]));
    assert!(!store.contains(&ids[2]));
    assert_eq!(stats.snapshot().dropped_busy, 1);
}

/// Answers arriving out of order still reach their own waiters.
#[tokio::test]
async fn test_out_of_order_answers() {
    let harness = start(test_config());
    let waiter = Waiter::new(harness.gateway.store(), Duration::from_millis(50));
    let (u1, u2) = (RequestUuid::new(), RequestUuid::new());

    let first = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.wait(u1, Duration::from_secs(2)).await }
    });
    let second = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.wait(u2, Duration::from_secs(2)).await }
    });

    publish_response(&harness.bus, &ResponseMessage::success(Cmd::Reboot, u2)).await;
    publish_response(
        &harness.bus,
        &ResponseMessage::failure(Cmd::Reboot, u1, 3, "device busy"),
    )
    .await;

    let r1 = first.await.unwrap().expect("u1 answered");
    let r2 = second.await.unwrap().expect("u2 answered");
    assert_eq!(r1.request_uuid, Some(u1));
    assert!(!r1.is_success());
    assert_eq!(r2.request_uuid, Some(u2));
    assert!(r2.is_success());
}

/// Two waiters on one id share a single answer: one gets it, the other
/// times out.
#[tokio::test(start_paused = true)]
async fn test_same_id_answered_once() {
    let store = Arc::new(CorrelationStore::new(8));
    let waiter = Waiter::new(store.clone(), Duration::from_millis(100));
    let id = RequestUuid::new();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let waiter = waiter.clone();
            tokio::spawn(async move { waiter.wait(id, Duration::from_secs(2)).await })
        })
        .collect();

    // Let both waiters subscribe before the answer lands
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.store(id, ResponseMessage::success(Cmd::Reboot, id));

    let mut answered = 0;
    let mut timed_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(response) => {
                assert_eq!(response.request_uuid, Some(id));
                answered += 1;
            }
            Err(err) => {
                assert!(err.is_timeout(), "got {err:?}");
                timed_out += 1;
            }
        }
    }

    assert_eq!((answered, timed_out), (1, 1));
    assert_eq!(store.count(), 0);
    assert_eq!(store.stats().snapshot().loaded, 1);
}

#[tokio::test]
async fn test_failure_status_is_device_failure() {
    let harness = start(test_config());
    let _worker = spawn_worker(harness.bus.clone(), |envelope| {
        Some(ResponseMessage::failure(
            envelope.cmd,
            envelope.request_uuid,
            401,
            "authentication failed",
        ))
    });

    let err = harness
        .gateway
        .commands()
        .reboot("nvr-3")
        .await
        .expect_err("failure");

    match err {
        GatewayError::DeviceFailure { cmd, code, text, .. } => {
            assert_eq!(cmd, Cmd::Reboot);
            assert_eq!(code, 401);
            assert_eq!(text, "authentication failed");
        }
        other => panic!("expected DeviceFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_typed_round_trips() {
    let harness = start(test_config());
    let video = VideoConfig {
        channel: 2,
        resolution: "1920x1080".into(),
        frame_rate: 25,
        bitrate_kbps: 4096,
        codec: "H.265".into(),
    };
    let found = vec![DiscoveredDevice {
        ip: "10.1.0.20".into(),
        mac: Some("00:40:8c:01:02:03".into()),
        manufacturer: Some("Axis".into()),
        model: None,
        onvif_port: Some(80),
    }];

    let _worker = spawn_worker(harness.bus.clone(), {
        let video = video.clone();
        let found = found.clone();
        move |envelope| {
            let reply = ResponseMessage::success(envelope.cmd, envelope.request_uuid);
            let payload = match envelope.cmd {
                Cmd::GetVideoConfig => {
                    assert_eq!(envelope.payload.channel, Some(2));
                    ResponsePayload {
                        video_config: Some(video.clone()),
                        ..ResponsePayload::default()
                    }
                }
                Cmd::SetVideoConfig => {
                    assert_eq!(envelope.payload.video_config.as_ref(), Some(&video));
                    ResponsePayload::default()
                }
                Cmd::ScanDevices => {
                    let scan = envelope.payload.scan.expect("scan request");
                    assert_eq!(scan.subnets, vec!["10.1.0.0/24".to_string()]);
                    ResponsePayload {
                        device_list: Some(found.clone()),
                        ..ResponsePayload::default()
                    }
                }
                other => panic!("unexpected command {other}"),
            };
            Some(reply.with_payload(payload))
        }
    });
    let commands = harness.gateway.commands();

    assert_eq!(commands.get_video_config("cam-1", 2).await.unwrap(), video);
    commands.set_video_config("cam-1", video.clone()).await.unwrap();
    let scanned = commands
        .scan_devices(
            "worker-lan-1",
            ScanRequest {
                subnets: vec!["10.1.0.0/24".into()],
                probe_timeout_ms: Some(500),
            },
        )
        .await
        .unwrap();
    assert_eq!(scanned, found);
}

#[tokio::test]
async fn test_request_raw_returns_failure_unchanged() {
    let harness = start(test_config());
    let _worker = spawn_worker(harness.bus.clone(), |envelope| {
        Some(ResponseMessage::failure(
            envelope.cmd,
            envelope.request_uuid,
            9,
            "not supported",
        ))
    });

    let response = harness
        .gateway
        .commands()
        .request_raw(
            "cam-9",
            Cmd::GetNetworkConfig,
            Default::default(),
            Duration::from_secs(1),
        )
        .await
        .expect("raw response");
    assert!(!response.is_success());
    assert_eq!(response.response_status.code, 9);
}

#[tokio::test]
async fn test_malformed_message_does_not_stop_ingestion() {
    let harness = start(test_config());
    let id = RequestUuid::new();

    harness
        .bus
        .publish(RESPONSE_TOPIC, "{\"Cmd\": ".to_string())
        .await
        .unwrap();
    publish_response(&harness.bus, &ResponseMessage::success(Cmd::Reboot, id)).await;

    let store = harness.gateway.store();
    wait_until(|| store.contains(&id)).await;
    assert_eq!(harness.gateway.ingestion_stats().snapshot().decode_failures, 1);
    assert!(harness.gateway.is_running());
}

#[tokio::test]
async fn test_registration_then_keep_alive_upserts_one_device() {
    let harness = start(test_config());
    let register = ResponseMessage::notification(Cmd::DeviceRegister, camera_info());
    let keep_alive = ResponseMessage::notification(
        Cmd::KeepAlive,
        DeviceInfo {
            mac: "BC-AD-28-11-22-33".into(),
            ..DeviceInfo::default()
        },
    );

    publish_response(&harness.bus, &register).await;
    publish_response(&harness.bus, &keep_alive).await;

    let stats = harness.gateway.ingestion_stats();
    wait_until(|| stats.snapshot().routed == 2).await;

    let mac: MacAddress = "bc:ad:28:11:22:33".parse().unwrap();
    let device = harness.repository.get(&mac).expect("device stored");
    assert_eq!(harness.repository.len(), 1);
    assert!(device.online);
    assert_eq!(device.model.as_deref(), Some("DS-2CD2143"));
    assert_eq!(harness.gateway.store().count(), 0);
}

#[tokio::test]
async fn test_shutdown_stops_ingestion() {
    let mut harness = start(test_config());
    assert!(harness.gateway.is_running());

    timeout(Duration::from_secs(1), harness.gateway.shutdown())
        .await
        .expect("shutdown completes");

    assert!(!harness.gateway.is_running());
}
