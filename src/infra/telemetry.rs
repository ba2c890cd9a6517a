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
            "vetrina_content_fetch_ok_total",
            Unit::Count,
            "Total number of successful spreadsheet content pulls."
        );
        describe_counter!(
            "vetrina_content_fallback_total",
            Unit::Count,
            "Total number of post reads served from a fallback tier."
        );
        describe_counter!(
            "vetrina_login_denied_total",
            Unit::Count,
            "Total number of rejected admin login attempts."
        );
        describe_counter!(
            "vetrina_rate_limited_total",
            Unit::Count,
            "Total number of public requests rejected by the rate limiter."
        );
        describe_counter!(
            "vetrina_contact_relay_failure_total",
            Unit::Count,
            "Total number of contact submissions the relay did not accept."
        );
        describe_histogram!(
            "vetrina_sheet_fetch_ms",
            Unit::Milliseconds,
            "Spreadsheet fetch latency in milliseconds."
        );
    });
}
