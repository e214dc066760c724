use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

tokio::task_local! {
    static REQUEST_PERF: Arc<RequestPerf>;
}

/// Query counters for the request currently being served.
#[derive(Debug)]
pub struct RequestPerf {
    started: Instant,
    query_count: AtomicU64,
    query_time_us: AtomicU64,
}

impl Default for RequestPerf {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestPerf {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            query_count: AtomicU64::new(0),
            query_time_us: AtomicU64::new(0),
        }
    }

    pub fn record_query(&self, elapsed: Duration) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.query_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PerfSnapshot {
        let query_time = Duration::from_micros(self.query_time_us.load(Ordering::Relaxed));
        PerfSnapshot {
            query_count: self.query_count.load(Ordering::Relaxed),
            query_time,
            remaining_time: self.started.elapsed().saturating_sub(query_time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfSnapshot {
    pub query_count: u64,
    pub query_time: Duration,
    /// Time spent outside SQL queries.
    pub remaining_time: Duration,
}

impl fmt::Display for PerfSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.3} {:.3}",
            self.query_count,
            self.query_time.as_secs_f64(),
            self.remaining_time.as_secs_f64()
        )
    }
}

/// Runs `fut` with `perf` as the current request's counters.
pub async fn scope<F: Future>(perf: Arc<RequestPerf>, fut: F) -> F::Output {
    REQUEST_PERF.scope(perf, fut).await
}

/// Adds a query to the current request's counters. Outside a request scope
/// (cron jobs) this is a no-op.
pub fn record_query(elapsed: Duration) {
    let _ = REQUEST_PERF.try_with(|perf| perf.record_query(elapsed));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queries_recorded_inside_scope() {
        let perf = Arc::new(RequestPerf::new());
        scope(perf.clone(), async {
            record_query(Duration::from_millis(20));
            record_query(Duration::from_millis(5));
        })
        .await;

        let snapshot = perf.snapshot();
        assert_eq!(snapshot.query_count, 2);
        assert_eq!(snapshot.query_time, Duration::from_millis(25));
    }

    #[tokio::test]
    async fn test_record_outside_scope_is_ignored() {
        record_query(Duration::from_millis(20));

        let perf = RequestPerf::new();
        assert_eq!(perf.snapshot().query_count, 0);
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = PerfSnapshot {
            query_count: 3,
            query_time: Duration::from_millis(1500),
            remaining_time: Duration::from_millis(250),
        };
        assert_eq!(snapshot.to_string(), "3 1.500 0.250");
    }
}
