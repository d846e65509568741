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

pub const ARTICLE_RENDER_TOTAL: &str = "quire_article_render_total";
pub const ARTICLE_RENDER_FAILURES_TOTAL: &str = "quire_article_render_failures_total";
pub const ARTICLE_RENDER_MS: &str = "quire_article_render_ms";

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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            ARTICLE_RENDER_TOTAL,
            Unit::Count,
            "Total number of article render attempts."
        );
        describe_counter!(
            ARTICLE_RENDER_FAILURES_TOTAL,
            Unit::Count,
            "Total number of article renders that ended in an error, by kind."
        );
        describe_histogram!(
            ARTICLE_RENDER_MS,
            Unit::Milliseconds,
            "Article fetch and render latency in milliseconds."
        );
    });
}
