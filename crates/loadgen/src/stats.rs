use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::tasks::Task;

/// Outcome counters of one task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStats {
    pub requests: u64,
    pub failures: u64,
    pub total_time: Duration,
    pub min_time: Option<Duration>,
    pub max_time: Duration,
}

impl TaskStats {
    pub fn record(&mut self, elapsed: Duration, succeeded: bool) {
        self.requests += 1;
        if !succeeded {
            self.failures += 1;
        }
        self.total_time += elapsed;
        self.min_time = Some(self.min_time.map_or(elapsed, |min| min.min(elapsed)));
        self.max_time = self.max_time.max(elapsed);
    }

    pub fn average_time(&self) -> Duration {
        match u32::try_from(self.requests) {
            Ok(0) => Duration::ZERO,
            Ok(requests) => self.total_time / requests,
            Err(_) => {
                Duration::from_secs_f64(self.total_time.as_secs_f64() / self.requests as f64)
            }
        }
    }
}

/// Stats shared by all simulated users.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    tasks: Arc<Mutex<BTreeMap<Task, TaskStats>>>,
}

impl Stats {
    pub async fn record(&self, task: Task, elapsed: Duration, succeeded: bool) {
        self.tasks
            .lock()
            .await
            .entry(task)
            .or_default()
            .record(elapsed, succeeded);
    }

    pub async fn snapshot(&self) -> BTreeMap<Task, TaskStats> {
        self.tasks.lock().await.clone()
    }

    /// Logs one line per task plus an aggregated line.
    pub async fn report(&self) {
        let snapshot = self.snapshot().await;
        let mut aggregated = TaskStats::default();
        for (task, stats) in snapshot.iter() {
            log_line(task.name(), stats);
            aggregated.requests += stats.requests;
            aggregated.failures += stats.failures;
            aggregated.total_time += stats.total_time;
            if let Some(min) = stats.min_time {
                aggregated.min_time = Some(aggregated.min_time.map_or(min, |m| m.min(min)));
            }
            aggregated.max_time = aggregated.max_time.max(stats.max_time);
        }
        log_line("Aggregated", &aggregated);
    }
}

fn log_line(name: &str, stats: &TaskStats) {
    info!(
        "{:<16} reqs={} fails={} avg={}ms min={}ms max={}ms",
        name,
        stats.requests,
        stats.failures,
        stats.average_time().as_millis(),
        stats.min_time.unwrap_or_default().as_millis(),
        stats.max_time.as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_task_stats_record() {
        let mut stats = TaskStats::default();
        assert_eq!(stats.average_time(), Duration::ZERO);

        stats.record(Duration::from_millis(100), true);
        stats.record(Duration::from_millis(300), false);
        stats.record(Duration::from_millis(200), true);

        assert_eq!(stats.requests, 3);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.min_time, Some(Duration::from_millis(100)));
        assert_eq!(stats.max_time, Duration::from_millis(300));
        assert_eq!(stats.average_time(), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_stats_are_shared_between_clones() {
        let stats = Stats::default();
        let other = stats.clone();

        stats.record(Task::DummyPass, Duration::from_millis(5), true).await;
        other.record(Task::DummyError, Duration::from_millis(5), false).await;
        other.record(Task::DummyPass, Duration::from_millis(5), true).await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot[&Task::DummyPass].requests, 2);
        assert_eq!(snapshot[&Task::DummyError].failures, 1);
        stats.report().await;
    }
}
