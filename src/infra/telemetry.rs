use std::fs::OpenOptions;
use std::sync::{Arc, Once};

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr unless a log file is configured; stdout is reserved for
/// tool output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.file.as_ref() {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            format_layer(logging.format, fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => format_layer(logging.format, fmt::layer().with_writer(std::io::stderr)),
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

fn format_layer<S, W>(
    format: LogFormat,
    layer: fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, W>,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => layer.compact().with_target(true).boxed(),
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "mealie_cache_recipe_hit_total",
            Unit::Count,
            "Total number of recipe-document cache hits."
        );
        describe_counter!(
            "mealie_cache_recipe_miss_total",
            Unit::Count,
            "Total number of recipe-document cache misses, including expired entries."
        );
        describe_counter!(
            "mealie_cache_recipe_expired_total",
            Unit::Count,
            "Total number of recipe documents purged on read after their TTL."
        );
        describe_counter!(
            "mealie_cache_recipe_evict_total",
            Unit::Count,
            "Total number of recipe documents evicted due to capacity."
        );
        describe_counter!(
            "mealie_cache_listing_hit_total",
            Unit::Count,
            "Total number of summary-listing cache hits."
        );
        describe_counter!(
            "mealie_cache_listing_miss_total",
            Unit::Count,
            "Total number of summary-listing cache misses."
        );
        describe_counter!(
            "mealie_listing_fetch_total",
            Unit::Count,
            "Total number of full summary-listing fetches from the API."
        );
        describe_counter!(
            "mealie_api_retry_total",
            Unit::Count,
            "Total number of retried Mealie API requests."
        );
        describe_counter!(
            "mealie_group_slug_failure_total",
            Unit::Count,
            "Total number of failed group-slug resolutions."
        );
        describe_counter!(
            "mealie_recipe_write_total",
            Unit::Count,
            "Total number of successful recipe writes, labelled by operation."
        );
    });
}
