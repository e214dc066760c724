use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use std::time::Duration;

use super::constants::metrics;

/// Duration and failure instruments for scheduled job runs.
#[derive(Debug, Clone)]
pub struct CronMetrics {
    duration: Histogram<f64>,
    failures: Counter<u64>,
}

impl CronMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            duration: meter
                .f64_histogram(metrics::CRON_DURATION)
                .with_description(metrics::CRON_DURATION_DESCRIPTION)
                .with_unit("s")
                .build(),
            failures: meter
                .u64_counter(metrics::CRON_FAILURES)
                .with_description(metrics::CRON_FAILURES_DESCRIPTION)
                .build(),
        }
    }

    pub fn record(&self, job: &str, elapsed: Duration, succeeded: bool) {
        let attributes = [KeyValue::new(metrics::CRON_JOB, job.to_string())];
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        if !succeeded {
            self.failures.add(1, &attributes);
        }
    }
}
