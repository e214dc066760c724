use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::stats::Stats;
use crate::tasks::{Task, TaskSet};

/// Pause between two tasks of the same user, in milliseconds.
pub const WAIT_TIME_MS: RangeInclusive<u64> = 1000..=5000;

/// One simulated user: picks a task, issues its request, waits, repeats.
pub struct User {
    id: usize,
    client: reqwest::Client,
    host: String,
    tasks: Arc<TaskSet>,
    stats: Stats,
    rng: StdRng,
}

impl User {
    pub fn new(
        id: usize,
        client: reqwest::Client,
        host: String,
        tasks: Arc<TaskSet>,
        stats: Stats,
    ) -> Self {
        Self {
            id,
            client,
            host,
            tasks,
            stats,
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Issues the request for `task` and records the outcome. Transport
    /// errors and non-2xx responses count as failures. Returns whether the
    /// request succeeded.
    pub async fn execute(&mut self, task: Task) -> bool {
        let url = format!("{}{}", self.host, task.path(&mut self.rng));
        let started = Instant::now();
        let succeeded = match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                // drain the body so the latency covers the full response
                let _ = response.bytes().await;
                debug!(user = self.id, url = %url, status = status.as_u16(), "request done");
                status.is_success()
            }
            Err(err) => {
                debug!(user = self.id, url = %url, error = %err, "request failed");
                false
            }
        };
        self.stats.record(task, started.elapsed(), succeeded).await;
        succeeded
    }

    pub fn wait_time(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(WAIT_TIME_MS))
    }

    pub async fn run(mut self) {
        loop {
            let task = self.tasks.pick(&mut self.rng);
            self.execute(task).await;
            let wait = self.wait_time();
            tokio::time::sleep(wait).await;
        }
    }
}
