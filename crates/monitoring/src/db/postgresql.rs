use async_trait::async_trait;
use common::errors::ServerError;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info_span, warn, Instrument, Span};

use super::{perf, Database};
use crate::telemetry::constants::db;

/// PostgreSQL backend. Every statement is counted in the request perf
/// counters and, when instrumented, wrapped in a client span.
#[derive(Clone)]
pub struct PostgreSQLDatabase {
    client: Arc<Client>,
    db_name: String,
    instrumented: bool,
}

impl PostgreSQLDatabase {
    pub async fn connect(
        connection_string: &str,
        db_name: String,
        instrumented: bool,
    ) -> Result<Self, ServerError> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls)
            .await
            .map_err(|e| ServerError::Database(format!("Failed to connect to database: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Database connection error: {}", e);
            }
        });

        debug!(db = %db_name, instrumented, "connected to database");
        Ok(Self {
            client: Arc::new(client),
            db_name,
            instrumented,
        })
    }

    fn query_span(&self, sql: &str) -> Span {
        if !self.instrumented {
            return Span::none();
        }
        info_span!(
            "db.query",
            otel.name = "SELECT",
            otel.kind = "client",
            db.system.name = db::SYSTEM_POSTGRESQL,
            db.namespace = %self.db_name,
            db.query.text = %sql,
        )
    }

    async fn timed<T, F>(&self, sql: &str, query: F) -> Result<T, ServerError>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        let started = Instant::now();
        let result = query.instrument(self.query_span(sql)).await;
        perf::record_query(started.elapsed());
        result.map_err(|e| ServerError::Database(e.to_string()))
    }
}

/// Builds the aggregation statement. Values are integers we generate, so
/// they are inlined as a VALUES list.
pub fn sum_values_sql(values: &[i64]) -> String {
    let rows = values
        .iter()
        .map(|value| format!("({})", value))
        .collect::<Vec<_>>()
        .join(",");
    format!("SELECT SUM(value)::bigint FROM (VALUES {}) AS v(value)", rows)
}

#[async_trait]
impl Database for PostgreSQLDatabase {
    async fn sleep(&self, seconds: i64) -> Result<(), ServerError> {
        let sql = "SELECT pg_sleep($1)";
        let seconds = seconds as f64;
        self.timed(sql, self.client.execute(sql, &[&seconds]))
            .await
            .map(|_| ())
    }

    async fn sum_values(&self, values: &[i64]) -> Result<Option<i64>, ServerError> {
        if values.is_empty() {
            return Ok(None);
        }
        let sql = sum_values_sql(values);
        let row = self.timed(&sql, self.client.query_one(&sql, &[])).await?;
        row.try_get::<_, Option<i64>>(0)
            .map_err(|e| ServerError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_values_sql() {
        assert_eq!(
            sum_values_sql(&[4, 4, 4]),
            "SELECT SUM(value)::bigint FROM (VALUES (4),(4),(4)) AS v(value)"
        );
    }
}
