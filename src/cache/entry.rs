//! Per-fingerprint cache state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::infra::http::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// A fetch is in flight.
    Fetching,
    /// Data is current and may be served without a fetch.
    Fresh,
    /// Data (if any) must be refetched before the next read is served.
    Stale,
    /// The last fetch failed after its retries.
    Error,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Fetching => "fetching",
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Error => "error",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of an entry, delivered to subscribers on every transition.
///
/// `data` keeps the last good payload through later `Stale`, `Fetching` and
/// `Error` states.
#[derive(Debug)]
pub struct CacheSnapshot<V> {
    pub status: CacheStatus,
    pub data: Option<Arc<V>>,
    pub error: Option<ApiError>,
    pub updated_at: Option<Instant>,
}

impl<V> Clone for CacheSnapshot<V> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

pub(crate) type SharedFetch<V> = Shared<BoxFuture<'static, Result<Arc<V>, ApiError>>>;

pub(crate) struct InFlight<V> {
    pub generation: u64,
    pub future: SharedFetch<V>,
}

pub(crate) struct Entry<V> {
    pub status: CacheStatus,
    pub data: Option<Arc<V>>,
    pub error: Option<ApiError>,
    pub updated_at: Option<Instant>,
    pub in_flight: Option<InFlight<V>>,
    pub subscribers: HashMap<u64, UnboundedSender<CacheSnapshot<V>>>,
    /// Last time the entry was read, settled or lost a subscriber.
    pub idle_since: Instant,
}

impl<V> Entry<V> {
    pub fn new(now: Instant) -> Self {
        Self {
            status: CacheStatus::Stale,
            data: None,
            error: None,
            updated_at: None,
            in_flight: None,
            subscribers: HashMap::new(),
            idle_since: now,
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot<V> {
        CacheSnapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }

    pub fn is_servable(&self, now: Instant, stale_time: Duration) -> bool {
        self.status == CacheStatus::Fresh
            && self.data.is_some()
            && self
                .updated_at
                .is_some_and(|at| now.saturating_duration_since(at) < stale_time)
    }

    pub fn in_flight_generation(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|flight| flight.generation)
    }

    /// Move to `status` and push the new snapshot to every live subscriber.
    pub fn transition(&mut self, status: CacheStatus) {
        self.status = status;
        self.notify();
    }

    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|_, sender| sender.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn transitions_reach_live_subscribers_and_prune_closed_ones() {
        let mut entry: Entry<String> = Entry::new(Instant::now());
        let (live_tx, mut live_rx) = unbounded_channel();
        let (closed_tx, closed_rx) = unbounded_channel();
        entry.subscribers.insert(1, live_tx);
        entry.subscribers.insert(2, closed_tx);
        drop(closed_rx);

        entry.transition(CacheStatus::Fetching);

        let snapshot = live_rx.try_recv().expect("snapshot delivered");
        assert_eq!(snapshot.status, CacheStatus::Fetching);
        assert_eq!(entry.subscribers.len(), 1);
    }

    #[test]
    fn fresh_entry_without_timestamp_is_not_servable() {
        let now = Instant::now();
        let mut entry: Entry<String> = Entry::new(now);
        entry.status = CacheStatus::Fresh;
        entry.data = Some(Arc::new("payload".into()));
        assert!(!entry.is_servable(now, Duration::from_secs(60)));

        entry.updated_at = Some(now);
        assert!(entry.is_servable(now, Duration::from_secs(60)));
        assert!(!entry.is_servable(now + Duration::from_secs(60), Duration::from_secs(60)));
    }
}
