pub mod meter;

use anyhow::Context as _;
use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub logs: EnvFilterConfig,
    pub traces: EnvFilterConfig,
    pub otlp: Option<OtlpConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OtlpConfig {
    pub url: String,
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

impl TryFrom<&EnvFilterConfig> for EnvFilter {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_from(config: &EnvFilterConfig) -> Result<Self, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(config.default_level.parse()?)
            .parse(config.filters.join(","))
    }
}

impl MonitoringConfig {
    //Console logging is always active. Logs, traces and metrics are additionally exported when OTLP is configured.
    pub fn init(&self) -> anyhow::Result<()> {
        let log_filter = EnvFilter::try_from(&self.logs).context("Invalid log filter")?;

        let Some(otlp) = &self.otlp else {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(log_filter))
                .init();
            return Ok(());
        };

        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", self.service_name.clone()))
            .build();

        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::default());

        let logger_provider = init_logs(resource.clone(), &otlp.url)?;
        let otel_log_filter = EnvFilter::try_from(&self.logs).context("Invalid log filter")?;
        let otel_log_layer = OpenTelemetryTracingBridge::new(&logger_provider).with_filter(otel_log_filter);

        let tracer_provider = init_traces(resource.clone(), &otlp.url)?;
        let tracer = tracer_provider.tracer(self.service_name.clone());
        let trace_filter = EnvFilter::try_from(&self.traces).context("Invalid trace filter")?;
        let trace_layer = OpenTelemetryLayer::new(tracer).with_filter(trace_filter);

        let meter_provider = init_metrics(resource, &otlp.url, otlp.metrics_interval_secs)?;
        opentelemetry::global::set_meter_provider(meter_provider);

        tracing_subscriber::registry()
            .with(trace_layer)
            .with(otel_log_layer)
            .with(tracing_subscriber::fmt::layer().with_filter(log_filter))
            .init();

        tracing::info!("Exporting telemetry of {} to {}", self.service_name, otlp.url);

        Ok(())
    }
}

fn init_traces(resource: Resource, url: &str) -> Result<SdkTracerProvider, ExporterBuildError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(url)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

fn init_metrics(resource: Resource, url: &str, interval_secs: u64) -> Result<SdkMeterProvider, ExporterBuildError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(url)
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(std::time::Duration::from_secs(interval_secs))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}

fn init_logs(resource: Resource, url: &str) -> Result<SdkLoggerProvider, ExporterBuildError> {
    let exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(url)
        .build()?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}
