//! Subscriber installation for `users-api`.
//!
//! Log records go to stdout as one JSON object per line. Spans are also sent
//! to an OTLP collector, but only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set;
//! without it the service runs with logs alone and needs no collector.

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace::Tracer, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "users-api";

/// Install the global subscriber: level filter, JSON stdout, optional OTLP.
///
/// The filter comes from `RUST_LOG` when it is set and non-blank, and from
/// `log_level` (the `LOG_LEVEL` setting) otherwise.
///
/// # Errors
///
/// Returns an error if the chosen filter does not parse, the OTLP exporter
/// cannot be installed, or a global subscriber is already set.
pub fn init_telemetry(otlp_endpoint: Option<&str>, log_level: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(rust_log.as_deref(), log_level);
    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("invalid log filter {directives:?}"))?;

    let otel_layer = otlp_endpoint
        .map(otlp_tracer)
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .try_init()
        .context("failed to initialise tracing subscriber")?;

    Ok(())
}

/// Flush pending spans and stop the exporter. Nothing to do without one.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// `RUST_LOG` wins over `LOG_LEVEL` unless it is empty.
fn filter_directives<'a>(rust_log: Option<&'a str>, log_level: &'a str) -> &'a str {
    match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives,
        _ => log_level,
    }
}

fn otlp_tracer(endpoint: &str) -> Result<Tracer> {
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
            Resource::new(vec![
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                    SERVICE_NAME,
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                    env!("CARGO_PKG_VERSION"),
                ),
            ]),
        ))
        .install_batch(runtime::Tokio)
        .with_context(|| format!("failed to install OTLP exporter for {endpoint}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_applies_without_rust_log() {
        assert_eq!(filter_directives(None, "warn"), "warn");
    }

    #[test]
    fn rust_log_overrides_log_level() {
        assert_eq!(
            filter_directives(Some("users_api=debug"), "info"),
            "users_api=debug"
        );
    }

    #[test]
    fn blank_rust_log_falls_back() {
        assert_eq!(filter_directives(Some("  "), "info"), "info");
    }

    #[test]
    fn default_log_level_is_a_valid_filter() {
        assert!(EnvFilter::try_new("info").is_ok());
    }
}
