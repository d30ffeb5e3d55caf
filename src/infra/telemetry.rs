use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
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
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "balera_page_cache_hit_total",
            Unit::Count,
            "Total number of rendered-page cache hits."
        );
        describe_counter!(
            "balera_page_cache_miss_total",
            Unit::Count,
            "Total number of rendered-page cache misses."
        );
        describe_counter!(
            "balera_page_cache_evict_total",
            Unit::Count,
            "Total number of rendered-page cache evictions due to capacity."
        );
        describe_gauge!(
            "balera_page_cache_entries",
            Unit::Count,
            "Current number of cached rendered pages."
        );
        describe_counter!(
            "balera_notify_dropped_total",
            Unit::Count,
            "Total number of change events dropped due to queue overflow."
        );
        describe_histogram!(
            "balera_notify_ms",
            Unit::Milliseconds,
            "Change event delivery latency in milliseconds."
        );
        describe_counter!(
            "balera_revalidate_marked_total",
            Unit::Count,
            "Total number of paths marked stale by the invalidation endpoint."
        );
        describe_histogram!(
            "balera_revalidate_ms",
            Unit::Milliseconds,
            "Invalidation request processing latency in milliseconds."
        );
    });
}
