//! Invalidation router.
//!
//! Called after the API confirms a write. Turns the mutation into an
//! [`InvalidationPlan`] and marks matching cache entries stale. Never fetches.

use tracing::{debug, info};

use super::events::MutationEvent;
use super::planner::InvalidationPlan;
use super::store::QueryCache;

pub struct InvalidationRouter<V> {
    cache: QueryCache<V>,
}

impl<V> Clone for InvalidationRouter<V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<V> InvalidationRouter<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(cache: QueryCache<V>) -> Self {
        Self { cache }
    }

    /// Invalidate every cached read the mutation may have changed.
    ///
    /// Returns the number of entries marked stale.
    pub fn on_mutation_success(&self, event: &MutationEvent) -> usize {
        let plan = InvalidationPlan::for_event(event);
        debug!(%event, %plan, "planned invalidation");

        let changed = self
            .cache
            .invalidate(|fingerprint| plan.matches(fingerprint));
        info!(%event, invalidated = changed, "mutation applied to cache");
        changed
    }
}
