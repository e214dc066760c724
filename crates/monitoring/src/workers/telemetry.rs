use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{Instruments, Worker, WorkerError, WorkerKind};
use crate::telemetry::TelemetryBootstrap;

/// Wraps a worker so that, before it runs, the process gets its own resource
/// attributes, providers and the instrumentation selected by the flags.
pub struct TelemetryWorker<W> {
    inner: W,
    bootstrap: Arc<TelemetryBootstrap>,
    db_name: String,
}

impl<W: Worker> TelemetryWorker<W> {
    pub fn new(inner: W, bootstrap: Arc<TelemetryBootstrap>, db_name: String) -> Self {
        Self {
            inner,
            bootstrap,
            db_name,
        }
    }
}

#[async_trait]
impl<W: Worker> Worker for TelemetryWorker<W> {
    fn kind(&self) -> WorkerKind {
        self.inner.kind()
    }

    /// The instruments passed in are ignored; the decorator derives them from
    /// the bootstrap.
    async fn run(&self, _instruments: Instruments) -> Result<(), WorkerError> {
        let mut telemetry = self.bootstrap.configure_worker(self.kind())?;
        telemetry.init_logging(&self.db_name);
        self.bootstrap.apply_instrumentation(&mut telemetry);
        info!(
            kind = %self.kind(),
            instance = %telemetry.resource.instance_id,
            "worker telemetry ready"
        );

        let result = self.inner.run(telemetry.instruments()).await;
        telemetry.shutdown();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::configuration::{ExporterKind, InstrumentOptions, TelemetryConfig};
    use std::sync::Mutex;

    /// Captures the instruments it is started with.
    struct RecordingWorker {
        kind: WorkerKind,
        seen: Mutex<Option<Instruments>>,
    }

    #[async_trait]
    impl Worker for RecordingWorker {
        fn kind(&self) -> WorkerKind {
            self.kind
        }

        async fn run(&self, instruments: Instruments) -> Result<(), WorkerError> {
            *self.seen.lock().unwrap() = Some(instruments);
            Ok(())
        }
    }

    fn bootstrap(options: InstrumentOptions) -> Arc<TelemetryBootstrap> {
        let config = TelemetryConfig {
            exporter: ExporterKind::None,
            ..TelemetryConfig::default()
        };
        Arc::new(TelemetryBootstrap::new(config, options))
    }

    #[tokio::test]
    async fn test_decorator_hands_instruments_to_inner_worker() {
        let options = InstrumentOptions {
            metrics: true,
            libraries: vec!["postgres".to_string(), "nope".to_string()],
            ..InstrumentOptions::default()
        };
        let worker = TelemetryWorker::new(
            RecordingWorker {
                kind: WorkerKind::Http,
                seen: Mutex::new(None),
            },
            bootstrap(options),
            "test".to_string(),
        );

        worker.run(Instruments::default()).await.unwrap();

        let seen = worker.inner.seen.lock().unwrap().take().unwrap();
        assert!(seen.instrumentation.postgres);
        assert!(!seen.instrumentation.http);
        assert!(seen.http_metrics.is_some());
        assert!(seen.cron_metrics.is_none());
    }

    #[tokio::test]
    async fn test_decorator_without_flags_passes_inert_instruments() {
        let worker = TelemetryWorker::new(
            RecordingWorker {
                kind: WorkerKind::Cron,
                seen: Mutex::new(None),
            },
            bootstrap(InstrumentOptions::default()),
            "test".to_string(),
        );

        assert_eq!(worker.kind(), WorkerKind::Cron);
        worker.run(Instruments::default()).await.unwrap();

        let seen = worker.inner.seen.lock().unwrap().take().unwrap();
        assert!(!seen.instrumentation.any());
        assert!(seen.http_metrics.is_none());
        assert!(seen.cron_metrics.is_none());
    }
}
