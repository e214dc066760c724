use common::configuration::{ExporterKind, TelemetryConfig};
use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing::warn;

use super::TelemetryError;

/// The three signal providers of one process. Logs are batched, metrics
/// exported periodically and traces batched, all through the configured
/// exporter.
#[derive(Debug, Clone)]
pub struct TelemetryProviders {
    pub logger: SdkLoggerProvider,
    pub meter: SdkMeterProvider,
    pub tracer: SdkTracerProvider,
}

impl TelemetryProviders {
    pub fn build(config: &TelemetryConfig, resource: Resource) -> Result<Self, TelemetryError> {
        Ok(Self {
            logger: logger_provider(config, resource.clone())?,
            meter: meter_provider(config, resource.clone())?,
            tracer: tracer_provider(config, resource)?,
        })
    }

    /// Registers the meter and tracer providers as process globals. The logs
    /// signal has no global; the log bridge holds the provider instead.
    pub fn install_globals(&self) {
        global::set_meter_provider(self.meter.clone());
        global::set_tracer_provider(self.tracer.clone());
    }

    /// Flushes and stops all providers, logging failures.
    pub fn shutdown(&self) {
        if let Err(err) = self.tracer.shutdown() {
            warn!(error = %err, "failed to shut down tracer provider");
        }
        if let Err(err) = self.meter.shutdown() {
            warn!(error = %err, "failed to shut down meter provider");
        }
        if let Err(err) = self.logger.shutdown() {
            warn!(error = %err, "failed to shut down logger provider");
        }
    }
}

pub fn logger_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, TelemetryError> {
    let builder = SdkLoggerProvider::builder().with_resource(resource);
    let provider = match config.exporter {
        ExporterKind::Otlp => {
            let mut exporter = opentelemetry_otlp::LogExporter::builder().with_tonic();
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            builder.with_batch_exporter(exporter.build()?).build()
        }
        ExporterKind::Stdout => builder
            .with_batch_exporter(opentelemetry_stdout::LogExporter::default())
            .build(),
        ExporterKind::None => builder.build(),
    };
    Ok(provider)
}

pub fn meter_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let builder = SdkMeterProvider::builder().with_resource(resource);
    let interval = config.metric_export_interval;
    let provider = match config.exporter {
        ExporterKind::Otlp => {
            let mut exporter = opentelemetry_otlp::MetricExporter::builder().with_tonic();
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            let reader = PeriodicReader::builder(exporter.build()?)
                .with_interval(interval)
                .build();
            builder.with_reader(reader).build()
        }
        ExporterKind::Stdout => {
            let reader = PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                .with_interval(interval)
                .build();
            builder.with_reader(reader).build()
        }
        ExporterKind::None => builder.build(),
    };
    Ok(provider)
}

pub fn tracer_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let builder = SdkTracerProvider::builder().with_resource(resource);
    let provider = match config.exporter {
        ExporterKind::Otlp => {
            let mut exporter = opentelemetry_otlp::SpanExporter::builder().with_tonic();
            if let Some(endpoint) = &config.otlp_endpoint {
                exporter = exporter.with_endpoint(endpoint.clone());
            }
            builder.with_batch_exporter(exporter.build()?).build()
        }
        ExporterKind::Stdout => builder
            .with_batch_exporter(opentelemetry_stdout::SpanExporter::default())
            .build(),
        ExporterKind::None => builder.build(),
    };
    Ok(provider)
}
