use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// One data point of a gauge, values widened to f64.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GaugePoint {
    pub name: String,
    pub value: f64,
    pub attributes: Vec<(String, String)>,
}

pub(crate) fn in_memory_provider() -> (SdkMeterProvider, InMemoryMetricExporter) {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder()
        .with_reader(PeriodicReader::builder(exporter.clone()).build())
        .build();
    (provider, exporter)
}

fn attributes<'a>(kvs: impl Iterator<Item = &'a KeyValue>) -> Vec<(String, String)> {
    kvs.map(|kv| (kv.key.as_str().to_string(), kv.value.to_string()))
        .collect()
}

/// Flushes `provider` and returns every gauge point exported so far.
pub(crate) fn gauge_points(
    provider: &SdkMeterProvider,
    exporter: &InMemoryMetricExporter,
) -> Vec<GaugePoint> {
    provider.force_flush().unwrap();

    let mut points = Vec::new();
    for resource_metrics in exporter.get_finished_metrics().unwrap() {
        for scope in resource_metrics.scope_metrics() {
            for metric in scope.metrics() {
                let values: Vec<(f64, Vec<(String, String)>)> = match metric.data() {
                    AggregatedMetrics::U64(MetricData::Gauge(gauge)) => gauge
                        .data_points()
                        .map(|dp| (dp.value() as f64, attributes(dp.attributes())))
                        .collect(),
                    AggregatedMetrics::F64(MetricData::Gauge(gauge)) => gauge
                        .data_points()
                        .map(|dp| (dp.value(), attributes(dp.attributes())))
                        .collect(),
                    _ => Vec::new(),
                };
                points.extend(values.into_iter().map(|(value, attributes)| GaugePoint {
                    name: metric.name().to_string(),
                    value,
                    attributes,
                }));
            }
        }
    }
    points
}

/// Tracing layer keeping the level, target and message of every event.
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedEvents(Arc<Mutex<Vec<(Level, String, String)>>>);

impl CapturedEvents {
    pub fn events(&self) -> Vec<(Level, String, String)> {
        self.0.lock().unwrap().clone()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        let metadata = event.metadata();
        self.0.lock().unwrap().push((
            *metadata.level(),
            metadata.target().to_string(),
            visitor.0,
        ));
    }
}
