pub mod bootstrap;
pub mod constants;
mod cron_metrics;
mod http_metrics;
pub mod instrumentation;
pub mod providers;
pub mod resource;
#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{DeploymentInfo, TelemetryBootstrap, WorkerTelemetry};
pub use cron_metrics::CronMetrics;
pub use http_metrics::HttpMetrics;
pub use instrumentation::{Instrumentation, InstrumentationRegistry};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),
}
