//! Revalidating cache around the current-price resolver
//!
//! The cache owns the last resolved quote and the in-flight resolution
//! marker. Consumers never talk to the resolver directly:
//!
//! ```text
//! PriceSubscription (poll task, focus, refresh)
//!     ↓
//! RevalidatingCache::revalidate  ── dedup window / join in-flight
//!     ↓
//! spawned resolution task ── CurrentPriceResolver
//!     ↓
//! commit (generation check) → watch snapshot + broadcast event
//! ```
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`. Resolutions run in their own task and commit their result
//! themselves, so dropping a caller's future cannot leave a dangling
//! in-flight marker.

use crate::{
    config::CacheConfig,
    error::ProviderError,
    resolver::CurrentPriceResolver,
    types::{CurrentPrice, PriceEvent},
};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Result of one resolution, shared by every caller that joined it
pub type ResolveOutcome = Result<Arc<CurrentPrice>, Arc<ProviderError>>;

/// A resolution that callers may await, clone, or drop
pub type PendingPrice = Shared<BoxFuture<'static, ResolveOutcome>>;

/// Consumer-facing view of the cache
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    /// Latest committed quote
    pub value: Option<Arc<CurrentPrice>>,
    /// No quote yet and a resolution is in flight
    pub is_loading: bool,
    /// A quote exists and a resolution is in flight
    pub is_validating: bool,
    /// The last attempt failed and no quote masks it
    pub is_error: bool,
    /// Error of the last attempt, if it failed
    pub error: Option<Arc<ProviderError>>,
}

struct InFlight {
    generation: u64,
    future: PendingPrice,
}

#[derive(Default)]
struct CacheState {
    value: Option<Arc<CurrentPrice>>,
    error: Option<Arc<ProviderError>>,
    in_flight: Option<InFlight>,
    last_started: Option<Instant>,
    last_outcome: Option<ResolveOutcome>,
    next_generation: u64,
    committed_generation: u64,
}

impl CacheState {
    fn snapshot(&self) -> PriceSnapshot {
        let in_flight = self.in_flight.is_some();
        PriceSnapshot {
            value: self.value.clone(),
            is_loading: self.value.is_none() && in_flight,
            is_validating: self.value.is_some() && in_flight,
            is_error: self.value.is_none() && self.error.is_some(),
            error: self.error.clone(),
        }
    }
}

#[derive(Default)]
struct Consumers {
    count: usize,
    poller: Option<JoinHandle<()>>,
}

struct CacheInner {
    resolver: Arc<CurrentPriceResolver>,
    config: CacheConfig,
    state: Mutex<CacheState>,
    consumers: Mutex<Consumers>,
    snapshot_tx: watch::Sender<PriceSnapshot>,
    events_tx: broadcast::Sender<PriceEvent>,
}

impl CacheInner {
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn consumers(&self) -> MutexGuard<'_, Consumers> {
        self.consumers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CacheState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }

    /// Joins the in-flight resolution, reuses a result inside the dedup
    /// window, or starts a new resolution.
    fn revalidate(self: &Arc<Self>) -> PendingPrice {
        let mut state = self.state();

        // A resolution superseded by `mutate` is never joined
        if let Some(in_flight) = &state.in_flight {
            if in_flight.generation > state.committed_generation {
                tracing::trace!(generation = in_flight.generation, "Joining in-flight resolution");
                return in_flight.future.clone();
            }
        }

        let now = Instant::now();
        if let (Some(started), Some(outcome)) = (state.last_started, &state.last_outcome) {
            if now.duration_since(started) < self.config.deduping_window {
                tracing::trace!("Reusing result inside dedup window");
                return futures::future::ready(outcome.clone()).boxed().shared();
            }
        }

        state.next_generation += 1;
        let generation = state.next_generation;

        let task_inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome: ResolveOutcome = task_inner
                .resolver
                .resolve()
                .await
                .map(Arc::new)
                .map_err(Arc::new);
            task_inner.commit(generation, outcome.clone());
            outcome
        });

        let join_inner = Arc::clone(self);
        let future = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome: ResolveOutcome =
                        Err(Arc::new(ProviderError::TaskFailed(e.to_string())));
                    join_inner.commit(generation, outcome.clone());
                    outcome
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight = Some(InFlight {
            generation,
            future: future.clone(),
        });
        state.last_started = Some(now);
        self.publish(&state);

        future
    }

    /// Records a finished resolution unless something newer already committed
    fn commit(&self, generation: u64, outcome: ResolveOutcome) {
        let mut state = self.state();

        if state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            state.in_flight = None;
        }

        if generation <= state.committed_generation {
            tracing::debug!(
                generation,
                committed = state.committed_generation,
                "Discarding stale resolution"
            );
            self.publish(&state);
            return;
        }

        state.committed_generation = generation;
        state.last_outcome = Some(outcome.clone());

        let event = match outcome {
            Ok(price) => {
                let old_price = state.value.replace(Arc::clone(&price)).map(|p| p.price);
                state.error = None;
                PriceEvent::PriceUpdated {
                    id: Uuid::new_v4(),
                    old_price,
                    new_price: price.price,
                    change_24h: price.change_24h,
                    source: price.source.clone(),
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    has_cached_value = state.value.is_some(),
                    "Current price resolution failed"
                );
                let error_message = e.to_string();
                state.error = Some(e);
                PriceEvent::PriceFetchFailed {
                    id: Uuid::new_v4(),
                    error_message,
                    timestamp: Utc::now(),
                }
            }
        };

        self.publish(&state);
        tracing::debug!(
            event_id = %event.id(),
            event_type = event.event_type(),
            "Publishing price event"
        );
        // No receivers is fine
        let _ = self.events_tx.send(event);
    }

    /// Overwrites the cached quote; any resolution already in flight is
    /// discarded when it completes
    fn mutate(&self, price: CurrentPrice) {
        let mut state = self.state();

        state.next_generation += 1;
        state.committed_generation = state.next_generation;

        let price = Arc::new(price);
        state.value = Some(Arc::clone(&price));
        state.error = None;
        state.last_outcome = Some(Ok(price));

        self.publish(&state);
    }

    fn notify_focus(self: &Arc<Self>) {
        if self.config.revalidate_on_focus {
            tracing::debug!("Focus regained, revalidating");
            // The resolution task runs whether or not the future is awaited
            drop(self.revalidate());
        }
    }

    fn add_consumer(self: &Arc<Self>) {
        let mut consumers = self.consumers();
        consumers.count += 1;

        if consumers.poller.is_none() {
            let inner = Arc::clone(self);
            consumers.poller = Some(tokio::spawn(poll(inner)));
            tracing::info!(
                refresh_interval_ms = self.config.refresh_interval.as_millis() as u64,
                "Starting price polling"
            );
        }
    }

    fn remove_consumer(&self) {
        let mut consumers = self.consumers();
        consumers.count = consumers.count.saturating_sub(1);

        if consumers.count == 0 {
            if let Some(poller) = consumers.poller.take() {
                poller.abort();
                tracing::info!("Last consumer gone, stopping price polling");
            }
        }
    }
}

/// Revalidates immediately, then once per refresh interval
async fn poll(inner: Arc<CacheInner>) {
    if inner.config.refresh_interval.is_zero() {
        let _ = inner.revalidate().await;
        return;
    }

    let mut ticker = tokio::time::interval(inner.config.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let _ = inner.revalidate().await;
    }
}

/// Polling, deduplicating, stale-while-error cache for the current price
///
/// Requires a running tokio runtime for every operation that may start a
/// resolution.
pub struct RevalidatingCache {
    inner: Arc<CacheInner>,
}

impl RevalidatingCache {
    /// Creates a cache around `resolver`
    pub fn new(resolver: Arc<CurrentPriceResolver>, config: CacheConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(PriceSnapshot::default());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(CacheInner {
                resolver,
                config,
                state: Mutex::new(CacheState::default()),
                consumers: Mutex::new(Consumers::default()),
                snapshot_tx,
                events_tx,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Starts (or joins) a resolution and returns it without awaiting
    pub fn revalidate(&self) -> PendingPrice {
        self.inner.revalidate()
    }

    /// Bypasses the poll timer, honouring the dedup window
    pub async fn refresh(&self) -> ResolveOutcome {
        self.inner.revalidate().await
    }

    /// Signals that the consuming context regained foreground attention
    pub fn notify_focus(&self) {
        self.inner.notify_focus();
    }

    /// Writes a quote locally, superseding any in-flight resolution
    pub fn mutate(&self, price: CurrentPrice) {
        self.inner.mutate(price);
    }

    /// Current view of the cache
    pub fn snapshot(&self) -> PriceSnapshot {
        self.inner.state().snapshot()
    }

    /// Registers an active consumer; polling runs while any subscription lives
    pub fn subscribe(&self) -> PriceSubscription {
        let receiver = self.inner.snapshot_tx.subscribe();
        self.inner.add_consumer();

        PriceSubscription {
            inner: Arc::clone(&self.inner),
            receiver,
        }
    }

    /// Receives price update and failure events
    pub fn events(&self) -> broadcast::Receiver<PriceEvent> {
        self.inner.events_tx.subscribe()
    }

    /// Number of live subscriptions
    pub fn consumer_count(&self) -> usize {
        self.inner.consumers().count
    }
}

/// An active consumer of the cache
///
/// Dropping the last subscription stops polling.
pub struct PriceSubscription {
    inner: Arc<CacheInner>,
    receiver: watch::Receiver<PriceSnapshot>,
}

impl PriceSubscription {
    /// Latest published view
    pub fn snapshot(&self) -> PriceSnapshot {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published view
    pub async fn changed(&mut self) -> PriceSnapshot {
        if self.receiver.changed().await.is_err() {
            tracing::debug!("Snapshot channel closed");
        }
        self.receiver.borrow_and_update().clone()
    }

    /// Bypasses the poll timer, honouring the dedup window
    pub async fn refresh(&self) -> ResolveOutcome {
        self.inner.revalidate().await
    }

    /// Signals that the consuming context regained foreground attention
    pub fn notify_focus(&self) {
        self.inner.notify_focus();
    }
}

impl Drop for PriceSubscription {
    fn drop(&mut self) {
        self.inner.remove_consumer();
    }
}
