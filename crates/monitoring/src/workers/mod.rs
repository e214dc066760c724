use async_trait::async_trait;
use common::errors::ServerError;
use std::fmt::Display;
use std::io;
use std::str::FromStr;
use thiserror::Error;

use crate::telemetry::{CronMetrics, HttpMetrics, Instrumentation, TelemetryError};

pub mod cron;
pub mod http;
pub mod supervisor;
pub mod telemetry;

pub use cron::CronWorker;
pub use http::{HttpWorker, ListenerMode};
pub use supervisor::Supervisor;
pub use telemetry::TelemetryWorker;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("unknown worker kind '{0}'")]
    UnknownKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Serves HTTP requests.
    Http,
    /// Runs scheduled jobs.
    Cron,
}

impl Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::Http => write!(f, "http"),
            WorkerKind::Cron => write!(f, "cron"),
        }
    }
}

impl FromStr for WorkerKind {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(WorkerKind::Http),
            "cron" => Ok(WorkerKind::Cron),
            other => Err(WorkerError::UnknownKind(other.to_string())),
        }
    }
}

/// What a worker should instrument while it runs. The default is inert.
#[derive(Debug, Clone, Default)]
pub struct Instruments {
    pub instrumentation: Instrumentation,
    pub http_metrics: Option<HttpMetrics>,
    pub cron_metrics: Option<CronMetrics>,
}

/// The run entry point shared by every worker kind.
#[async_trait]
pub trait Worker: Send + Sync {
    fn kind(&self) -> WorkerKind;

    async fn run(&self, instruments: Instruments) -> Result<(), WorkerError>;
}
