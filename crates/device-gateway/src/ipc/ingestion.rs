//! Response ingestion loop.
//!
//! One task per consumer group. Every message is decoded, admitted to the
//! correlation store when it answers a request, and routed when it is a
//! notification. Nothing that happens to a single message stops the loop.

use crate::domain::{CorrelationStore, IngestError, StoreOutcome};
use crate::ipc::router::{CommandRouter, RouteOutcome};
use shared_bus::{BusError, MessageBus};
use shared_types::{RequestUuid, ResponseMessage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What happened to one ingested payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Answer stored for its waiter. Notification commands carrying a
    /// `RequestUUID` are routed as well.
    Stored {
        request_uuid: RequestUuid,
        replaced: bool,
        route: Option<RouteOutcome>,
    },
    /// Duplicate of an answer a waiter already consumed; dropped.
    Redelivered { request_uuid: RequestUuid },
    /// Uncorrelated notification, handed to the router only.
    Notification(RouteOutcome),
}

/// Counters for the ingestion loop. Monotonic.
#[derive(Debug, Default)]
pub struct IngestionStats {
    pub received: AtomicU64,
    pub decode_failures: AtomicU64,
    pub dropped_busy: AtomicU64,
    pub stored: AtomicU64,
    pub redelivered: AtomicU64,
    pub routed: AtomicU64,
}

impl IngestionStats {
    pub fn snapshot(&self) -> IngestionStatsSnapshot {
        IngestionStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
            routed: self.routed.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`IngestionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStatsSnapshot {
    pub received: u64,
    pub decode_failures: u64,
    pub dropped_busy: u64,
    pub stored: u64,
    pub redelivered: u64,
    pub routed: u64,
}

/// Consumes worker responses and feeds the correlation store.
pub struct IngestionLoop {
    bus: Arc<dyn MessageBus>,
    store: Arc<CorrelationStore>,
    router: CommandRouter,
    consumer_group: String,
    error_backoff: Duration,
    stats: Arc<IngestionStats>,
}

impl IngestionLoop {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        store: Arc<CorrelationStore>,
        router: CommandRouter,
        consumer_group: impl Into<String>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            bus,
            store,
            router,
            consumer_group: consumer_group.into(),
            error_backoff,
            stats: Arc::new(IngestionStats::default()),
        }
    }

    /// Shared handle to the loop's counters.
    pub fn stats(&self) -> Arc<IngestionStats> {
        Arc::clone(&self.stats)
    }

    /// Run until the bus closes or `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(group = %self.consumer_group, "Response ingestion started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // Sender gone counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                received = self.bus.consume(&self.consumer_group) => received,
            };

            match received {
                Ok(message) => {
                    // Failures are logged inside ingest()
                    let _ = self.ingest(&message.payload).await;
                }
                Err(BusError::Closed) => {
                    warn!(group = %self.consumer_group, "Message bus closed, stopping ingestion");
                    break;
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        group = %self.consumer_group,
                        error = %e,
                        backoff_ms = self.error_backoff.as_millis() as u64,
                        "Transient bus error, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.error_backoff) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    error!(group = %self.consumer_group, error = %e, "Bus error, stopping ingestion");
                    break;
                }
            }
        }

        info!(group = %self.consumer_group, "Response ingestion stopped");
    }

    /// Process one raw payload.
    pub async fn ingest(&self, payload: &str) -> Result<IngestOutcome, IngestError> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let message: ResponseMessage = match serde_json::from_str(payload) {
            Ok(message) => message,
            Err(e) => {
                self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, len = payload.len(), "Dropping malformed response message");
                return Err(IngestError::Decode(e));
            }
        };

        let Some(request_uuid) = message.request_uuid else {
            let route = self.route(&message).await;
            return Ok(IngestOutcome::Notification(route));
        };

        // Notifications that echo an id are still routed after storing
        let notification = message.cmd.is_notification().then(|| message.clone());
        let cmd = message.cmd;

        let replaced = match self.store.admit(request_uuid, message) {
            StoreOutcome::Inserted => false,
            StoreOutcome::Replaced => true,
            StoreOutcome::Rejected => {
                self.stats.dropped_busy.fetch_add(1, Ordering::Relaxed);
                let capacity = self.store.capacity();
                warn!(
                    request_uuid = %request_uuid,
                    cmd = %cmd,
                    capacity = capacity,
                    "System busy: correlation store full, dropping response"
                );
                return Err(IngestError::CapacityExceeded {
                    request_uuid,
                    capacity,
                });
            }
            StoreOutcome::Redelivered => {
                self.stats.redelivered.fetch_add(1, Ordering::Relaxed);
                debug!(request_uuid = %request_uuid, cmd = %cmd, "Dropping redelivered response");
                return Ok(IngestOutcome::Redelivered { request_uuid });
            }
        };
        self.stats.stored.fetch_add(1, Ordering::Relaxed);
        debug!(request_uuid = %request_uuid, cmd = %cmd, replaced = replaced, "Response stored");

        let route = match notification {
            Some(message) => Some(self.route(&message).await),
            None => None,
        };

        Ok(IngestOutcome::Stored {
            request_uuid,
            replaced,
            route,
        })
    }

    async fn route(&self, message: &ResponseMessage) -> RouteOutcome {
        let outcome = self.router.route(message).await;
        if outcome != RouteOutcome::Ignored {
            self.stats.routed.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }
}
