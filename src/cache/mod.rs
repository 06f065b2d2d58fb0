//! Client-side query cache.
//!
//! - [`QueryCache`] owns one entry per [`Fingerprint`] and deduplicates
//!   concurrent fetches.
//! - [`InvalidationRouter`] marks entries stale after confirmed mutations,
//!   following the rules in [`InvalidationPlan`].
//!
//! Timing is controlled through the `[cache]` section of `marginalia.toml`:
//!
//! ```toml
//! [cache]
//! stale_seconds = 300
//! retry_count = 1
//! retry_delay_ms = 1000
//! gc_seconds = 300
//! ```

mod config;
mod entry;
mod events;
mod keys;
mod lock;
mod planner;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use entry::{CacheSnapshot, CacheStatus};
pub use events::{BookRefs, MutationEvent};
pub use keys::{
    DEFAULT_PAGE_SIZE, DEFAULT_POPULAR_LIMIT, Fingerprint, FingerprintPattern, ListQuery,
    MAX_PAGE_SIZE, MAX_POPULAR_LIMIT,
};
pub use planner::InvalidationPlan;
pub use store::{QueryCache, Subscription};
pub use trigger::InvalidationRouter;
