use common::configuration::{Configuration, InstrumentOptions};
use common::consts::{DEFAULT_CONFIG_PATH, MONITORING_CONFIG_PATH};
use monitoring::server;
use monitoring::workers::supervisor::WORKER_SUBCOMMAND;
use monitoring::workers::WorkerKind;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path =
        env::var(MONITORING_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Configuration::load(&config_path)?;

    // flags are read once here and inherited by every worker process
    let options = InstrumentOptions::from_env();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        None => server::run(config, options).await?,
        Some(WORKER_SUBCOMMAND) => {
            let kind: WorkerKind = args.next().unwrap_or_default().parse()?;
            if let Err(err) = server::run_worker(kind, config, options).await {
                eprintln!("{} worker failed: {}", kind, err);
                return Err(err.into());
            }
        }
        Some(other) => {
            eprintln!("usage: monitoring [worker http|cron]");
            return Err(format!("unknown command '{}'", other).into());
        }
    }

    Ok(())
}
