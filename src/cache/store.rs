//! Query cache store.
//!
//! One entry per fingerprint, at most one fetch in flight per entry. Fetches
//! run as shared futures so every concurrent reader awaits the same request.
//! Each fetch carries a generation drawn from a store-wide counter; a result is
//! written back only while its generation is still the entry's current one.
//!
//! The entry map sits behind a `std::sync::Mutex` that is never held across an
//! `.await`, so state changes happen atomically between suspension points.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::FutureExt;
use metrics::{counter, histogram};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, sleep};
use tracing::{debug, info, warn};

use crate::infra::http::ApiError;

use super::config::CacheConfig;
use super::entry::{CacheSnapshot, CacheStatus, Entry, InFlight, SharedFetch};
use super::keys::Fingerprint;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "marginalia_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "marginalia_cache_miss_total";
pub(crate) const METRIC_CACHE_JOIN: &str = "marginalia_cache_join_total";
pub(crate) const METRIC_CACHE_RETRY: &str = "marginalia_cache_retry_total";
pub(crate) const METRIC_CACHE_DISCARD: &str = "marginalia_cache_discard_total";
pub(crate) const METRIC_CACHE_INVALIDATE: &str = "marginalia_cache_invalidate_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "marginalia_cache_evict_total";
pub(crate) const METRIC_FETCH_MS: &str = "marginalia_fetch_ms";

/// Handle to a shared query cache. Clones refer to the same store.
pub struct QueryCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<V> {
    config: CacheConfig,
    entries: Mutex<HashMap<Fingerprint, Entry<V>>>,
    generation: AtomicU64,
    subscriber_ids: AtomicU64,
}

/// A live subscription to one fingerprint.
///
/// Receives one snapshot per status transition of the entry, in order.
#[derive(Debug)]
pub struct Subscription<V> {
    id: u64,
    fingerprint: Fingerprint,
    receiver: UnboundedReceiver<CacheSnapshot<V>>,
}

impl<V> Subscription<V> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Wait for the next snapshot. `None` once the entry is gone.
    pub async fn recv(&mut self) -> Option<CacheSnapshot<V>> {
        self.receiver.recv().await
    }

    /// Next snapshot already delivered, if any.
    pub fn try_recv(&mut self) -> Option<CacheSnapshot<V>> {
        self.receiver.try_recv().ok()
    }
}

impl<V> QueryCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                entries: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                subscriber_ids: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Serve `fingerprint` from cache or fetch it.
    ///
    /// A fresh entry younger than the stale window is returned without calling
    /// `fetcher`. Otherwise the caller joins the fetch already in flight or
    /// starts one. Callers attached to a fetch that was detached by
    /// invalidation still receive its result, but the entry does not.
    pub async fn resolve<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        fetcher: F,
    ) -> Result<Arc<V>, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let future = {
            let mut entries = mutex_lock(&self.inner.entries, SOURCE, "resolve");
            let now = Instant::now();
            let entry = entries
                .entry(fingerprint.clone())
                .or_insert_with(|| Entry::new(now));
            entry.idle_since = now;

            if entry.is_servable(now, self.inner.config.stale_time)
                && let Some(data) = entry.data.as_ref()
            {
                counter!(METRIC_CACHE_HIT, "domain" => fingerprint.kind().as_str()).increment(1);
                debug!(target: SOURCE, %fingerprint, "cache hit");
                return Ok(Arc::clone(data));
            }

            match entry.in_flight.as_ref() {
                Some(flight) => {
                    counter!(METRIC_CACHE_JOIN, "domain" => fingerprint.kind().as_str())
                        .increment(1);
                    debug!(
                        target: SOURCE,
                        %fingerprint,
                        generation = flight.generation,
                        "joining in-flight fetch"
                    );
                    flight.future.clone()
                }
                None => {
                    if entry.status == CacheStatus::Fresh {
                        entry.transition(CacheStatus::Stale);
                    }
                    let generation = self.inner.next_generation();
                    let future =
                        Arc::clone(&self.inner).start_fetch(fingerprint.clone(), generation, fetcher);
                    entry.in_flight = Some(InFlight {
                        generation,
                        future: future.clone(),
                    });
                    entry.transition(CacheStatus::Fetching);
                    counter!(METRIC_CACHE_MISS, "domain" => fingerprint.kind().as_str())
                        .increment(1);
                    info!(target: SOURCE, %fingerprint, generation, "fetch started");
                    future
                }
            }
        };

        future.await
    }

    pub fn snapshot(&self, fingerprint: &Fingerprint) -> Option<CacheSnapshot<V>> {
        mutex_lock(&self.inner.entries, SOURCE, "snapshot")
            .get(fingerprint)
            .map(Entry::snapshot)
    }

    pub fn status(&self, fingerprint: &Fingerprint) -> Option<CacheStatus> {
        mutex_lock(&self.inner.entries, SOURCE, "status")
            .get(fingerprint)
            .map(|entry| entry.status)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Mark every entry whose fingerprint satisfies `predicate` as stale.
    ///
    /// Never fetches. In-flight fetches of matched entries are detached.
    /// Returns the number of entries whose state changed.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&Fingerprint) -> bool,
    {
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "invalidate");
        let mut changed = 0usize;
        for (fingerprint, entry) in entries.iter_mut() {
            if !predicate(fingerprint) {
                continue;
            }
            let detached = entry.in_flight.take();
            if entry.status == CacheStatus::Stale && detached.is_none() {
                continue;
            }
            if let Some(flight) = detached {
                debug!(
                    target: SOURCE,
                    %fingerprint,
                    generation = flight.generation,
                    "detached in-flight fetch"
                );
            }
            entry.transition(CacheStatus::Stale);
            changed += 1;
        }
        drop(entries);

        if changed > 0 {
            counter!(METRIC_CACHE_INVALIDATE).increment(changed as u64);
        }
        changed
    }

    /// Drop every entry. Subscription channels close.
    pub fn clear(&self) {
        mutex_lock(&self.inner.entries, SOURCE, "clear").clear();
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Observe `fingerprint`. Creates a stale, empty entry when none exists.
    pub fn subscribe(&self, fingerprint: &Fingerprint) -> Subscription<V> {
        let (sender, receiver) = unbounded_channel();
        let id = self.inner.subscriber_ids.fetch_add(1, Ordering::Relaxed);

        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "subscribe");
        entries
            .entry(fingerprint.clone())
            .or_insert_with(|| Entry::new(Instant::now()))
            .subscribers
            .insert(id, sender);

        Subscription {
            id,
            fingerprint: fingerprint.clone(),
            receiver,
        }
    }

    /// Returns false if the subscription was already detached (entry collected or cleared).
    pub fn unsubscribe(&self, subscription: Subscription<V>) -> bool {
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "unsubscribe");
        let Some(entry) = entries.get_mut(&subscription.fingerprint) else {
            return false;
        };
        let removed = entry.subscribers.remove(&subscription.id).is_some();
        if entry.subscribers.is_empty() {
            entry.idle_since = Instant::now();
        }
        removed
    }

    pub fn subscriber_count(&self, fingerprint: &Fingerprint) -> usize {
        mutex_lock(&self.inner.entries, SOURCE, "subscriber_count")
            .get(fingerprint)
            .map_or(0, |entry| entry.subscribers.len())
    }

    // ========================================================================
    // Garbage collection
    // ========================================================================

    /// Evict entries with no subscribers and no fetch in flight that have been
    /// idle for at least the configured gc time.
    pub fn collect_garbage(&self) -> usize {
        let now = Instant::now();
        let gc_time = self.inner.config.gc_time;
        let mut entries = mutex_lock(&self.inner.entries, SOURCE, "collect_garbage");
        let before = entries.len();

        entries.retain(|fingerprint, entry| {
            let observed = entry.subscribers.len();
            entry.subscribers.retain(|_, sender| !sender.is_closed());
            if observed > 0 && entry.subscribers.is_empty() {
                entry.idle_since = now;
            }

            let keep = !entry.subscribers.is_empty()
                || entry.in_flight.is_some()
                || now.saturating_duration_since(entry.idle_since) < gc_time;
            if !keep {
                debug!(target: SOURCE, %fingerprint, "evicting idle entry");
            }
            keep
        });

        let evicted = before - entries.len();
        drop(entries);
        if evicted > 0 {
            counter!(METRIC_CACHE_EVICT).increment(evicted as u64);
        }
        evicted
    }

    /// Run [`collect_garbage`](Self::collect_garbage) every `interval` until the
    /// store is dropped.
    pub fn spawn_collector(&self, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner<V>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let evicted = QueryCache { inner }.collect_garbage();
                if evicted > 0 {
                    info!(target: SOURCE, evicted, "garbage collection pass");
                }
            }
        })
    }
}

impl<V> Inner<V>
where
    V: Send + Sync + 'static,
{
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn start_fetch<F, Fut>(
        self: Arc<Self>,
        fingerprint: Fingerprint,
        generation: u64,
        fetcher: F,
    ) -> SharedFetch<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        async move {
            let started = Instant::now();
            let result = self
                .fetch_with_retry(&fingerprint, &fetcher)
                .await
                .map(Arc::new);
            histogram!(METRIC_FETCH_MS, "domain" => fingerprint.kind().as_str())
                .record(started.elapsed().as_secs_f64() * 1000.0);
            self.settle(&fingerprint, generation, &result);
            result
        }
        .boxed()
        .shared()
    }

    async fn fetch_with_retry<F, Fut>(&self, fingerprint: &Fingerprint, fetcher: &F) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt = 1;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    counter!(METRIC_CACHE_RETRY, "class" => err.class()).increment(1);
                    warn!(
                        target: SOURCE,
                        %fingerprint,
                        attempt,
                        error = %err,
                        "fetch failed, retrying"
                    );
                    attempt += 1;
                    if !self.config.retry_delay.is_zero() {
                        sleep(self.config.retry_delay).await;
                    }
                }
                Err(err) => {
                    warn!(
                        target: SOURCE,
                        %fingerprint,
                        attempt,
                        error = %err,
                        "fetch failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Apply a finished fetch if `generation` is still current for the entry.
    fn settle(
        &self,
        fingerprint: &Fingerprint,
        generation: u64,
        result: &Result<Arc<V>, ApiError>,
    ) -> bool {
        let mut entries = mutex_lock(&self.entries, SOURCE, "settle");
        let current = entries
            .get_mut(fingerprint)
            .filter(|entry| entry.in_flight_generation() == Some(generation));
        let Some(entry) = current else {
            counter!(METRIC_CACHE_DISCARD).increment(1);
            debug!(target: SOURCE, %fingerprint, generation, "discarding superseded response");
            return false;
        };

        let now = Instant::now();
        entry.in_flight = None;
        entry.idle_since = now;
        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.updated_at = Some(now);
                entry.transition(CacheStatus::Fresh);
            }
            Err(err) => {
                entry.error = Some(err.clone());
                entry.transition(CacheStatus::Error);
            }
        }
        true
    }
}
