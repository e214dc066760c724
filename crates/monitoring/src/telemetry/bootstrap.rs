use common::configuration::{InstrumentOptions, TelemetryConfig};
use opentelemetry::global;
use opentelemetry::metrics::{Meter, MeterProvider as _, ObservableGauge};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::{debug, info};

use super::constants::{metrics, METER_NAME};
use super::cron_metrics::CronMetrics;
use super::http_metrics::HttpMetrics;
use super::instrumentation::{Instrumentation, InstrumentationRegistry};
use super::providers::{self, TelemetryProviders};
use super::resource::ResourceAttributes;
use super::TelemetryError;
use crate::utils::tracing::init_worker_logging;
use crate::workers::{Instruments, WorkerKind};

/// Telemetry setup for the whole process tree. Built once at startup from
/// the configuration and the environment flags, then handed to every worker
/// that needs it.
///
/// Nothing here guards against running twice in the same process: a second
/// `configure_worker` builds new providers and replaces the global ones.
#[derive(Debug, Clone)]
pub struct TelemetryBootstrap {
    config: TelemetryConfig,
    options: InstrumentOptions,
    registry: InstrumentationRegistry,
}

impl TelemetryBootstrap {
    pub fn new(config: TelemetryConfig, options: InstrumentOptions) -> Self {
        Self::with_registry(config, options, InstrumentationRegistry::default())
    }

    pub fn with_registry(
        config: TelemetryConfig,
        options: InstrumentOptions,
        registry: InstrumentationRegistry,
    ) -> Self {
        Self {
            config,
            options,
            registry,
        }
    }

    pub fn options(&self) -> &InstrumentOptions {
        &self.options
    }

    /// Evented mode: only a presence gauge is exported.
    pub fn register_deployment_info(&self) -> Result<DeploymentInfo, TelemetryError> {
        let resource =
            ResourceAttributes::capture(&self.config.service_name, &self.options.environment);
        let provider = providers::meter_provider(&self.config, resource.to_resource())?;
        global::set_meter_provider(provider.clone());

        let gauge = deployment_info_gauge(&provider.meter(METER_NAME));
        info!(major_version = MAJOR_VERSION, "registered deployment info gauge");
        Ok(DeploymentInfo { provider, gauge })
    }

    /// Worker-pool mode, first step: fresh resource for this worker process
    /// and the three providers, installed as globals.
    pub fn configure_worker(&self, kind: WorkerKind) -> Result<WorkerTelemetry, TelemetryError> {
        let resource =
            ResourceAttributes::capture(&self.config.service_name, &self.options.environment);
        let providers = TelemetryProviders::build(&self.config, resource.to_resource())?;
        providers.install_globals();

        Ok(WorkerTelemetry {
            kind,
            resource,
            providers,
            log_bridge: self.options.logs,
            instrumentation: Instrumentation::default(),
            http_metrics: None,
            cron_metrics: None,
        })
    }

    /// Worker-pool mode, second step, run once logging is up so the
    /// registry lookups are visible: metrics instruments and library
    /// instrumentation according to the flags.
    pub fn apply_instrumentation(&self, telemetry: &mut WorkerTelemetry) {
        if self.options.metrics {
            let meter = telemetry.providers.meter.meter(METER_NAME);
            match telemetry.kind {
                WorkerKind::Http => telemetry.http_metrics = Some(HttpMetrics::new(&meter)),
                WorkerKind::Cron => telemetry.cron_metrics = Some(CronMetrics::new(&meter)),
            }
        }

        if !self.options.libraries.is_empty() {
            telemetry.instrumentation =
                self.registry.instrument(self.options.libraries.as_slice());
            if telemetry.instrumentation.http {
                global::set_text_map_propagator(TraceContextPropagator::new());
            }
        }

        debug!(
            kind = %telemetry.kind,
            log_bridge = telemetry.log_bridge,
            http = telemetry.instrumentation.http,
            postgres = telemetry.instrumentation.postgres,
            metrics = self.options.metrics,
            "worker telemetry configured"
        );
    }
}

const MAJOR_VERSION: &str = env!("CARGO_PKG_VERSION_MAJOR");

/// Presence gauge: always observes 1, tagged with the major version.
pub fn deployment_info_gauge(meter: &Meter) -> ObservableGauge<u64> {
    meter
        .u64_observable_gauge(metrics::DEPLOYMENT_INFO)
        .with_description(metrics::DEPLOYMENT_INFO_DESCRIPTION)
        .with_callback(|observer| {
            observer.observe(1, &[KeyValue::new(metrics::MAJOR_VERSION, MAJOR_VERSION)]);
        })
        .build()
}

/// Keeps the evented-mode meter provider and its gauge alive.
pub struct DeploymentInfo {
    pub provider: SdkMeterProvider,
    pub gauge: ObservableGauge<u64>,
}

/// Everything the telemetry decorator set up for one worker process.
#[derive(Debug)]
pub struct WorkerTelemetry {
    pub kind: WorkerKind,
    pub resource: ResourceAttributes,
    pub providers: TelemetryProviders,
    pub log_bridge: bool,
    pub instrumentation: Instrumentation,
    pub http_metrics: Option<HttpMetrics>,
    pub cron_metrics: Option<CronMetrics>,
}

impl WorkerTelemetry {
    /// True when only the providers were configured.
    pub fn is_inert(&self) -> bool {
        !self.log_bridge
            && !self.instrumentation.any()
            && self.http_metrics.is_none()
            && self.cron_metrics.is_none()
    }

    pub fn init_logging(&self, db_name: &str) {
        init_worker_logging(db_name, &self.providers, self.log_bridge);
    }

    pub fn instruments(&self) -> Instruments {
        Instruments {
            instrumentation: self.instrumentation,
            http_metrics: self.http_metrics.clone(),
            cron_metrics: self.cron_metrics.clone(),
        }
    }

    pub fn shutdown(&self) {
        self.providers.shutdown();
    }
}
