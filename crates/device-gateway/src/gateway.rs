//! Device gateway - wires the store, ingestion loop and command service.

use crate::domain::{CorrelationStore, GatewayConfig, GatewayError};
use crate::ipc::{CommandPublisher, CommandRouter, IngestionLoop, IngestionStats, Waiter};
use crate::ports::{DeviceRepository, SystemTimeSource, TimeSource};
use crate::service::DeviceCommandService;
use shared_bus::MessageBus;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Running gateway state.
///
/// `new()` validates the configuration and builds every component;
/// `start()` spawns the ingestion loop; `shutdown()` stops it.
pub struct DeviceGateway {
    config: GatewayConfig,
    store: Arc<CorrelationStore>,
    commands: DeviceCommandService,
    ingestion: Option<IngestionLoop>,
    ingestion_stats: Arc<IngestionStats>,
    ingestion_handle: Option<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl DeviceGateway {
    /// Create a gateway using the system clock.
    pub fn new(
        config: GatewayConfig,
        bus: Arc<dyn MessageBus>,
        repository: Arc<dyn DeviceRepository>,
    ) -> Result<Self, GatewayError> {
        Self::with_clock(config, bus, repository, Arc::new(SystemTimeSource))
    }

    pub fn with_clock(
        config: GatewayConfig,
        bus: Arc<dyn MessageBus>,
        repository: Arc<dyn DeviceRepository>,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, GatewayError> {
        // Validate configuration
        config.validate()?;

        let store = Arc::new(CorrelationStore::with_redelivery_window(
            config.store.capacity,
            config.store.redelivery_window,
        ));

        let publisher = Arc::new(CommandPublisher::new(
            Arc::clone(&bus),
            config.bus.command_topic.clone(),
            Arc::clone(&clock),
        ));
        let waiter = Waiter::new(Arc::clone(&store), config.timeouts.poll_interval);
        let commands = DeviceCommandService::new(publisher, waiter, config.timeouts.clone());

        let router = CommandRouter::new(repository, clock);
        let ingestion = IngestionLoop::new(
            bus,
            Arc::clone(&store),
            router,
            config.bus.consumer_group.clone(),
            config.ingestion.error_backoff,
        );
        let ingestion_stats = ingestion.stats();

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            store,
            commands,
            ingestion: Some(ingestion),
            ingestion_stats,
            ingestion_handle: None,
            shutdown_tx,
        })
    }

    /// Spawn the ingestion loop. Calling it twice is a no-op.
    pub fn start(&mut self) {
        let Some(ingestion) = self.ingestion.take() else {
            warn!("Device gateway already started");
            return;
        };

        info!(
            group = %self.config.bus.consumer_group,
            response_topic = %self.config.bus.response_topic,
            command_topic = %self.config.bus.command_topic,
            capacity = self.config.store.capacity,
            "Starting device gateway"
        );
        let shutdown_rx = self.shutdown_tx.subscribe();
        self.ingestion_handle = Some(tokio::spawn(ingestion.run(shutdown_rx)));
    }

    /// Stop the ingestion loop and wait for it to exit.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.ingestion_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Ingestion task ended abnormally");
            }
        }
        info!("Device gateway stopped");
    }

    /// Whether the ingestion loop is still running.
    pub fn is_running(&self) -> bool {
        self.ingestion_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Handle for request handlers.
    pub fn commands(&self) -> DeviceCommandService {
        self.commands.clone()
    }

    pub fn store(&self) -> Arc<CorrelationStore> {
        Arc::clone(&self.store)
    }

    pub fn ingestion_stats(&self) -> Arc<IngestionStats> {
        Arc::clone(&self.ingestion_stats)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
