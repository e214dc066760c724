use async_trait::async_trait;
use common::errors::ServerError;

pub mod perf;
pub mod postgresql;

/// The database round trips the dummy workload needs.
#[async_trait]
pub trait Database: Send + Sync {
    /// Blocks the database session for `seconds`.
    async fn sleep(&self, seconds: i64) -> Result<(), ServerError>;

    /// Sums `values` server side in a single round trip.
    async fn sum_values(&self, values: &[i64]) -> Result<Option<i64>, ServerError>;
}
