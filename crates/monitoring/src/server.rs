use common::configuration::{Configuration, InstrumentOptions, ServerMode};
use std::sync::Arc;
use tracing::{info, warn};

use crate::telemetry::TelemetryBootstrap;
use crate::utils::tracing::init_logging;
use crate::workers::{
    CronWorker, HttpWorker, Instruments, ListenerMode, Supervisor, TelemetryWorker, Worker,
    WorkerError, WorkerKind,
};

fn db_name(config: &Configuration) -> String {
    config
        .database
        .name
        .clone()
        .unwrap_or_else(|| "-".to_string())
}

/// Entry point of the main process. The concurrency mode decides how
/// telemetry is set up.
pub async fn run(config: Configuration, options: InstrumentOptions) -> Result<(), WorkerError> {
    let config = Arc::new(config);
    let mode = config.server.effective_mode();
    init_logging(&db_name(&config));
    info!(mode = %mode, address = %config.server.bind_address, "starting");

    match mode {
        ServerMode::Evented => {
            let bootstrap = TelemetryBootstrap::new(config.telemetry.clone(), options);
            let deployment_info = bootstrap.register_deployment_info()?;
            let result = run_in_process(&config).await;
            if let Err(err) = deployment_info.provider.shutdown() {
                warn!(error = %err, "failed to shut down meter provider");
            }
            result
        }
        ServerMode::Threaded => {
            warn!("Threaded mode unsupported, telemetry disabled");
            run_in_process(&config).await
        }
        ServerMode::Prefork => Supervisor::new(&config.server)?.run().await,
    }
}

/// HTTP serving and cron jobs on the current runtime, without telemetry.
async fn run_in_process(config: &Arc<Configuration>) -> Result<(), WorkerError> {
    let http = HttpWorker::new(Arc::clone(config), ListenerMode::Exclusive);
    if config.server.max_cron_threads == 0 {
        return http.run(Instruments::default()).await;
    }
    let cron = CronWorker::new(Arc::clone(config));
    tokio::try_join!(
        http.run(Instruments::default()),
        cron.run(Instruments::default())
    )?;
    Ok(())
}

/// Builds a worker of `kind` with the telemetry decorator around it.
pub fn build_worker(
    kind: WorkerKind,
    config: Arc<Configuration>,
    bootstrap: Arc<TelemetryBootstrap>,
) -> Box<dyn Worker> {
    let db_name = db_name(&config);
    match kind {
        WorkerKind::Http => Box::new(TelemetryWorker::new(
            HttpWorker::new(config, ListenerMode::Shared),
            bootstrap,
            db_name,
        )),
        WorkerKind::Cron => Box::new(TelemetryWorker::new(
            CronWorker::new(config),
            bootstrap,
            db_name,
        )),
    }
}

/// Entry point of a worker process started by the supervisor.
pub async fn run_worker(
    kind: WorkerKind,
    config: Configuration,
    options: InstrumentOptions,
) -> Result<(), WorkerError> {
    let config = Arc::new(config);
    let bootstrap = Arc::new(TelemetryBootstrap::new(config.telemetry.clone(), options));
    build_worker(kind, config, bootstrap)
        .run(Instruments::default())
        .await
}
