use async_trait::async_trait;
use common::configuration::{CronAction, CronJob, Configuration};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info};

use super::{Instruments, Worker, WorkerError, WorkerKind};
use crate::db::postgresql::PostgreSQLDatabase;
use crate::models::dummy::DummyWorkload;
use crate::telemetry::CronMetrics;

/// Next run time of every configured job. Jobs are due immediately after
/// startup.
#[derive(Debug)]
pub struct CronSchedule {
    entries: Vec<(CronJob, Instant)>,
}

impl CronSchedule {
    pub fn new(jobs: Vec<CronJob>, now: Instant) -> Self {
        Self {
            entries: jobs.into_iter().map(|job| (job, now)).collect(),
        }
    }

    /// Returns the jobs due at `now` and moves each of them one interval
    /// past `now`.
    pub fn due(&mut self, now: Instant) -> Vec<CronJob> {
        let mut due = Vec::new();
        for (job, next_call) in self.entries.iter_mut() {
            if *next_call <= now {
                due.push(job.clone());
                *next_call = now + job.interval;
            }
        }
        due
    }
}

/// Runs one job, logging and recording the outcome. Returns whether the
/// job succeeded.
pub async fn run_job(
    workload: &DummyWorkload,
    job: &CronJob,
    metrics: Option<&CronMetrics>,
) -> bool {
    let started = Instant::now();
    let result = match job.action {
        CronAction::DatabaseWork { iterations } => workload.database_work(iterations).await,
        CronAction::Sleep { seconds } => workload.sleep(seconds).await.map(|_| ()),
    };
    let elapsed = started.elapsed();

    let succeeded = match result {
        Ok(()) => {
            info!(job = %job.name, elapsed = ?elapsed, "job done");
            true
        }
        Err(err) => {
            error!(job = %job.name, error = %err, "job failed");
            false
        }
    };
    if let Some(metrics) = metrics {
        metrics.record(&job.name, elapsed, succeeded);
    }
    succeeded
}

pub struct CronWorker {
    config: Arc<Configuration>,
}

impl CronWorker {
    pub fn new(config: Arc<Configuration>) -> Self {
        Self { config }
    }

    async fn run_schedule(
        &self,
        workload: DummyWorkload,
        metrics: Option<CronMetrics>,
    ) -> Result<(), WorkerError> {
        let mut schedule = CronSchedule::new(self.config.cron.jobs.clone(), Instant::now());
        loop {
            for job in schedule.due(Instant::now()) {
                run_job(&workload, &job, metrics.as_ref()).await;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.cron.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("received interrupt, exiting");
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait]
impl Worker for CronWorker {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Cron
    }

    async fn run(&self, instruments: Instruments) -> Result<(), WorkerError> {
        let database = &self.config.database;
        let db = PostgreSQLDatabase::connect(
            &database.connection_string,
            database.name.clone().unwrap_or_else(|| "-".to_string()),
            instruments.instrumentation.postgres,
        )
        .await?;

        info!(
            jobs = self.config.cron.jobs.len(),
            pid = std::process::id(),
            "cron worker started"
        );
        self.run_schedule(DummyWorkload::new(Arc::new(db)), instruments.cron_metrics)
            .await
    }
}
