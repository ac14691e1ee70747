//! IPC with device workers over the message bus.
//!
//! Outbound: [`CommandPublisher`] turns a typed request into a published
//! envelope. Inbound: [`IngestionLoop`] feeds the correlation store and
//! hands unsolicited notifications to the [`CommandRouter`]. The
//! [`Waiter`] joins the two for one `RequestUuid`.

pub mod ingestion;
pub mod publisher;
pub mod router;
pub mod waiter;

pub use ingestion::{IngestOutcome, IngestionLoop, IngestionStats, IngestionStatsSnapshot};
pub use publisher::CommandPublisher;
pub use router::{CommandRouter, RouteOutcome};
pub use waiter::{Acknowledged, ExpectedPayload, Waiter};
