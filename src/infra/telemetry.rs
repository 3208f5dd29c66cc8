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

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use crate::config::{LogFormat, LoggingSettings};

    use super::*;

    #[test]
    fn second_install_reports_telemetry_error() {
        let logging = LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        };
        assert!(init(&logging).is_ok());
        assert!(matches!(init(&logging), Err(InfraError::Telemetry(_))));
    }
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "trama_cache_hit_total",
            Unit::Count,
            "Total number of method-cache hits."
        );
        describe_counter!(
            "trama_cache_miss_total",
            Unit::Count,
            "Total number of method-cache misses."
        );
        describe_counter!(
            "trama_cache_write_total",
            Unit::Count,
            "Total number of method-cache payload writes."
        );
        describe_counter!(
            "trama_cache_error_total",
            Unit::Count,
            "Total number of cache-layer failures degraded to misses."
        );
        describe_counter!(
            "trama_cache_replay_total",
            Unit::Count,
            "Total number of submodel calls replayed on cache hits."
        );
        describe_histogram!(
            "trama_fetch_ms",
            Unit::Milliseconds,
            "Model fetch latency in milliseconds."
        );
    });
}
