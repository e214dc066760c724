use opentelemetry::metrics::{Gauge, Meter};

use super::constants::metrics;
use crate::db::perf::PerfSnapshot;

/// Per-request performance gauges, sampled when the access log record of a
/// request is emitted.
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    query_count: Gauge<u64>,
    query_time: Gauge<f64>,
    remaining_time: Gauge<f64>,
}

impl HttpMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            query_count: meter
                .u64_gauge(metrics::QUERY_COUNT)
                .with_description(metrics::QUERY_COUNT_DESCRIPTION)
                .build(),
            query_time: meter
                .f64_gauge(metrics::QUERY_TIME)
                .with_description(metrics::QUERY_TIME_DESCRIPTION)
                .with_unit("s")
                .build(),
            remaining_time: meter
                .f64_gauge(metrics::REMAINING_TIME)
                .with_description(metrics::REMAINING_TIME_DESCRIPTION)
                .with_unit("s")
                .build(),
        }
    }

    pub fn record(&self, perf: &PerfSnapshot) {
        self.query_count.record(perf.query_count, &[]);
        self.query_time.record(perf.query_time.as_secs_f64(), &[]);
        self.remaining_time
            .record(perf.remaining_time.as_secs_f64(), &[]);
    }
}
