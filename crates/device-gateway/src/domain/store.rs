//! Correlation Store - the meeting point of ingested responses and waiters.
//!
//! Maps `RequestUuid` to the worker's `ResponseMessage` until a waiter
//! consumes it. Unlike a pending-request table, entries are created by the
//! *response* side: a waiter may start before or after its answer lands.
//!
//! Flow:
//! 1. Handler mints a `RequestUuid` and publishes the command
//! 2. Handler's waiter subscribes to the key and polls `load()`
//! 3. Ingestion loop decodes the answer and calls `admit()`
//! 4. `admit()` signals the key's notifier; the waiter's `load()` consumes it
//!
//! All state sits behind one `parking_lot::Mutex`, so the capacity check,
//! the insert and the order index update are a single atomic step.

use parking_lot::Mutex;
use shared_types::{RequestUuid, ResponseMessage};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Default window during which a consumed key is remembered.
pub const DEFAULT_REDELIVERY_WINDOW: Duration = Duration::from_secs(120);

/// How often the consumed-key set is swept.
const CONSUMED_GC_INTERVAL: Duration = Duration::from_secs(10);

/// Result of a `store` / `admit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// New key appended to the order index.
    Inserted,
    /// Existing key; value replaced, insertion position kept.
    Replaced,
    /// New key refused because the store is full.
    Rejected,
    /// Key was consumed recently; this is a bus redelivery.
    Redelivered,
}

impl StoreOutcome {
    /// Whether the value is now in the store.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

/// Counters for the store. Monotonic.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub inserted: AtomicU64,
    pub replaced: AtomicU64,
    pub rejected: AtomicU64,
    pub redelivered: AtomicU64,
    pub loaded: AtomicU64,
    pub deleted: AtomicU64,
    pub evicted: AtomicU64,
}

impl StoreStats {
    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            inserted: self.inserted.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub inserted: u64,
    pub replaced: u64,
    pub rejected: u64,
    pub redelivered: u64,
    pub loaded: u64,
    pub deleted: u64,
    pub evicted: u64,
}

struct Entry {
    value: ResponseMessage,
    sequence: u64,
}

struct Subscription {
    notify: Arc<Notify>,
    waiters: usize,
}

/// Keys consumed by `load`, kept for a bounded window.
struct RecentlyConsumed {
    /// Key -> when it was consumed
    seen: HashMap<RequestUuid, Instant>,
    window: Duration,
    last_gc: Instant,
}

impl RecentlyConsumed {
    fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
            last_gc: Instant::now(),
        }
    }

    fn record(&mut self, key: RequestUuid, now: Instant) {
        if self.window.is_zero() {
            return;
        }
        self.seen.insert(key, now);
    }

    fn contains(&mut self, key: &RequestUuid, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_gc) > CONSUMED_GC_INTERVAL {
            self.garbage_collect(now);
            self.last_gc = now;
        }
        self.seen
            .get(key)
            .is_some_and(|at| now.saturating_duration_since(*at) <= self.window)
    }

    fn garbage_collect(&mut self, now: Instant) {
        let window = self.window;
        self.seen
            .retain(|_, at| now.saturating_duration_since(*at) <= window);
    }
}

struct StoreInner {
    entries: HashMap<RequestUuid, Entry>,
    /// Insertion sequence -> key; exactly the current key set
    order: BTreeMap<u64, RequestUuid>,
    next_sequence: u64,
    subscriptions: HashMap<RequestUuid, Subscription>,
    consumed: RecentlyConsumed,
}

impl StoreInner {
    fn upsert(
        &mut self,
        key: RequestUuid,
        value: ResponseMessage,
        capacity: usize,
    ) -> StoreOutcome {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            self.signal(&key);
            return StoreOutcome::Replaced;
        }

        if self.entries.len() >= capacity {
            return StoreOutcome::Rejected;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(key, Entry { value, sequence });
        self.order.insert(sequence, key);
        self.signal(&key);
        StoreOutcome::Inserted
    }

    fn remove(&mut self, key: &RequestUuid) -> Option<ResponseMessage> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.sequence);
        Some(entry.value)
    }

    fn signal(&self, key: &RequestUuid) {
        if let Some(subscription) = self.subscriptions.get(key) {
            // Stores a permit if the waiter is between polls
            subscription.notify.notify_one();
        }
    }
}

/// Bounded, thread-safe store of unclaimed responses.
///
/// Build one at startup and share it by `Arc`.
pub struct CorrelationStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
    stats: StoreStats,
}

impl CorrelationStore {
    /// Create a store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self::with_redelivery_window(capacity, DEFAULT_REDELIVERY_WINDOW)
    }

    /// Create a store with a custom redelivery window (zero disables it).
    pub fn with_redelivery_window(capacity: usize, window: Duration) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_sequence: 0,
                subscriptions: HashMap::new(),
                consumed: RecentlyConsumed::new(window),
            }),
            capacity,
            stats: StoreStats::default(),
        }
    }

    /// Upsert a response.
    ///
    /// A new key is refused with [`StoreOutcome::Rejected`] when the store
    /// is full; replacing an existing key always succeeds.
    pub fn store(&self, key: RequestUuid, value: ResponseMessage) -> StoreOutcome {
        let outcome = self.inner.lock().upsert(key, value, self.capacity);
        self.record(key, outcome);
        outcome
    }

    /// Ingestion-path upsert: like [`store`](Self::store), but refuses keys
    /// consumed within the redelivery window.
    pub fn admit(&self, key: RequestUuid, value: ResponseMessage) -> StoreOutcome {
        let outcome = {
            let mut inner = self.inner.lock();
            if inner.consumed.contains(&key, Instant::now()) {
                StoreOutcome::Redelivered
            } else {
                inner.upsert(key, value, self.capacity)
            }
        };
        self.record(key, outcome);
        outcome
    }

    /// Remove and return the response for `key`. Consume-once.
    pub fn load(&self, key: &RequestUuid) -> Option<ResponseMessage> {
        let value = {
            let mut inner = self.inner.lock();
            let value = inner.remove(key)?;
            inner.consumed.record(*key, Instant::now());
            value
        };
        self.stats.loaded.fetch_add(1, Ordering::Relaxed);
        trace!(request_uuid = %key, "Response consumed");
        Some(value)
    }

    /// Remove the entry for `key` without returning it.
    pub fn delete(&self, key: &RequestUuid) -> bool {
        let removed = self.inner.lock().remove(key).is_some();
        if removed {
            self.stats.deleted.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Remove the oldest entry still present. Maintenance only; admission
    /// never evicts.
    pub fn delete_oldest(&self) -> Option<RequestUuid> {
        let key = {
            let mut inner = self.inner.lock();
            let (_, key) = inner.order.pop_first()?;
            inner.entries.remove(&key);
            key
        };
        self.stats.evicted.fetch_add(1, Ordering::Relaxed);
        debug!(request_uuid = %key, "Evicted oldest response");
        Some(key)
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.count() >= self.capacity
    }

    pub fn contains(&self, key: &RequestUuid) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Keys in insertion order, oldest first.
    pub fn keys_by_age(&self) -> Vec<RequestUuid> {
        self.inner.lock().order.values().copied().collect()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Register interest in `key`; the returned notifier fires on store.
    ///
    /// Every call must be paired with [`unsubscribe`](Self::unsubscribe).
    pub(crate) fn subscribe(&self, key: RequestUuid) -> Arc<Notify> {
        let mut inner = self.inner.lock();
        let subscription = inner.subscriptions.entry(key).or_insert_with(|| Subscription {
            notify: Arc::new(Notify::new()),
            waiters: 0,
        });
        subscription.waiters += 1;
        Arc::clone(&subscription.notify)
    }

    pub(crate) fn unsubscribe(&self, key: &RequestUuid) {
        let mut inner = self.inner.lock();
        let remove = match inner.subscriptions.get_mut(key) {
            Some(subscription) => {
                subscription.waiters = subscription.waiters.saturating_sub(1);
                subscription.waiters == 0
            }
            None => false,
        };
        if remove {
            inner.subscriptions.remove(key);
        }
    }

    #[cfg(test)]
    fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions.len()
    }

    fn record(&self, key: RequestUuid, outcome: StoreOutcome) {
        let counter = match outcome {
            StoreOutcome::Inserted => &self.stats.inserted,
            StoreOutcome::Replaced => &self.stats.replaced,
            StoreOutcome::Rejected => &self.stats.rejected,
            StoreOutcome::Redelivered => &self.stats.redelivered,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        trace!(request_uuid = %key, outcome = ?outcome, "Store");
    }
}
