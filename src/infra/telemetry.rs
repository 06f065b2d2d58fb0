use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "marginalia_cache_hit_total",
            Unit::Count,
            "Reads served from a fresh cache entry."
        );
        describe_counter!(
            "marginalia_cache_miss_total",
            Unit::Count,
            "Reads that started a new fetch."
        );
        describe_counter!(
            "marginalia_cache_join_total",
            Unit::Count,
            "Reads that joined a fetch already in flight."
        );
        describe_counter!(
            "marginalia_cache_retry_total",
            Unit::Count,
            "Fetch attempts repeated after a failure."
        );
        describe_counter!(
            "marginalia_cache_discard_total",
            Unit::Count,
            "Fetch results dropped because a newer generation superseded them."
        );
        describe_counter!(
            "marginalia_cache_invalidate_total",
            Unit::Count,
            "Entries marked stale by invalidation."
        );
        describe_counter!(
            "marginalia_cache_evict_total",
            Unit::Count,
            "Idle entries removed by garbage collection."
        );
        describe_histogram!(
            "marginalia_fetch_ms",
            Unit::Milliseconds,
            "Latency of a fetch including retries, in milliseconds."
        );
    });
}
