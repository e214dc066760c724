use common::errors::ServerError;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::db::Database;

/// Values aggregated per database round trip.
const VALUES_PER_ROUND_TRIP: usize = 10;

/// How a sleep request is split between the process and the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    pub local_seconds: i64,
    pub database_seconds: i64,
}

impl SleepPlan {
    /// Clamps `seconds` to at least 2 and picks the local part uniformly in
    /// `[1, total)`, so both parts are at least one second.
    pub fn new<R: Rng>(seconds: i64, rng: &mut R) -> Self {
        let total = seconds.max(2);
        let local_seconds = rng.random_range(1..total);
        Self {
            local_seconds,
            database_seconds: total - local_seconds,
        }
    }

    pub fn total(&self) -> i64 {
        self.local_seconds + self.database_seconds
    }
}

pub fn clamp_iterations(iterations: i64) -> i64 {
    iterations.max(1)
}

/// The generated value set for round trip `iteration`.
pub fn round_trip_values(iteration: i64) -> Vec<i64> {
    vec![iteration; VALUES_PER_ROUND_TRIP]
}

/// Dummy operations used to generate monitoring data.
#[derive(Clone)]
pub struct DummyWorkload {
    db: Arc<dyn Database>,
}

impl DummyWorkload {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    pub async fn local_sleep(&self, seconds: i64) {
        tokio::time::sleep(Duration::from_secs(seconds.max(0) as u64)).await;
    }

    pub async fn database_sleep(&self, seconds: i64) -> Result<(), ServerError> {
        self.db.sleep(seconds).await
    }

    /// Issues exactly `max(1, iterations)` aggregation round trips.
    pub async fn database_work(&self, iterations: i64) -> Result<(), ServerError> {
        let iterations = clamp_iterations(iterations);
        for i in 0..iterations {
            self.db.sum_values(&round_trip_values(i)).await?;
        }
        Ok(())
    }

    /// Sleeps for `max(2, seconds)` in total, first in process then in the
    /// database.
    pub async fn sleep(&self, seconds: i64) -> Result<SleepPlan, ServerError> {
        let plan = SleepPlan::new(seconds, &mut rand::rng());
        debug!(
            local = plan.local_seconds,
            database = plan.database_seconds,
            "dummy sleep"
        );
        self.local_sleep(plan.local_seconds).await;
        self.database_sleep(plan.database_seconds).await?;
        Ok(plan)
    }
}
