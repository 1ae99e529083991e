use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,petcare_server=info,sqlx=warn,sea_orm=warn";

/// Flushes pending spans when dropped; keep it alive for the life of `main`.
pub struct TelemetryGuard {
    otlp_enabled: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if self.otlp_enabled {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

fn otlp_tracer(service_name: &str, endpoint: String) -> Result<sdktrace::Tracer, opentelemetry::trace::TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        resource::SERVICE_NAME,
        service_name.to_string(),
    )]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::config()
                .with_resource(resource)
                .with_sampler(sdktrace::Sampler::AlwaysOn),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Logging goes to stdout as text, or flattened JSON with `RUST_LOG_FORMAT=json`.
/// Spans are exported over OTLP when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn init_telemetry(service_name: &str) -> TelemetryGuard {
    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER));

    let mut otlp_error = None;
    let otel_layer = match std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        Ok(endpoint) => match otlp_tracer(service_name, endpoint) {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                otlp_error = Some(e);
                None
            }
        },
        Err(_) => None,
    };
    let otlp_enabled = otel_layer.is_some();

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    if log_format == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .without_time();
        registry.with(fmt_layer).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Reported only now that a subscriber exists.
    if let Some(e) = otlp_error {
        tracing::warn!(error = %e, "OTLP exporter disabled");
    }

    TelemetryGuard { otlp_enabled }
}
