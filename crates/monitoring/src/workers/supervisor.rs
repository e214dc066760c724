use common::configuration::ServerConfig;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use super::{WorkerError, WorkerKind};

/// How often the supervisor checks on its children.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Subcommand the supervisor uses to start a worker process.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Starts one OS process per worker by re-executing the current binary and
/// replaces workers that exit.
pub struct Supervisor {
    executable: PathBuf,
    plan: Vec<WorkerKind>,
}

/// The worker processes the supervisor keeps alive for `server`.
pub fn worker_plan(server: &ServerConfig) -> Vec<WorkerKind> {
    let http = std::iter::repeat(WorkerKind::Http).take(server.workers as usize);
    let cron = std::iter::repeat(WorkerKind::Cron).take(server.max_cron_threads as usize);
    http.chain(cron).collect()
}

struct Slot {
    kind: WorkerKind,
    child: Child,
}

impl Supervisor {
    pub fn new(server: &ServerConfig) -> Result<Self, WorkerError> {
        Ok(Self {
            executable: std::env::current_exe()?,
            plan: worker_plan(server),
        })
    }

    fn spawn(&self, kind: WorkerKind) -> Result<Slot, WorkerError> {
        let child = Command::new(&self.executable)
            .arg(WORKER_SUBCOMMAND)
            .arg(kind.to_string())
            .kill_on_drop(true)
            .spawn()?;
        info!(kind = %kind, pid = ?child.id(), "spawned worker");
        Ok(Slot { kind, child })
    }

    pub async fn run(&self) -> Result<(), WorkerError> {
        let mut slots = self
            .plan
            .iter()
            .map(|kind| self.spawn(*kind))
            .collect::<Result<Vec<_>, _>>()?;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("received interrupt, stopping workers");
                    break;
                }
            }

            for slot in slots.iter_mut() {
                match slot.child.try_wait() {
                    Ok(None) => {}
                    Ok(Some(status)) => {
                        if status.success() {
                            info!(kind = %slot.kind, "worker exited, replacing it");
                        } else {
                            warn!(kind = %slot.kind, status = %status, "worker died, replacing it");
                        }
                        *slot = self.spawn(slot.kind)?;
                    }
                    Err(err) => error!(kind = %slot.kind, error = %err, "failed to poll worker"),
                }
            }
        }

        for slot in slots.iter_mut() {
            if let Err(err) = slot.child.start_kill() {
                warn!(kind = %slot.kind, error = %err, "failed to stop worker");
            }
        }
        for slot in slots.iter_mut() {
            let _ = slot.child.wait().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_worker_plan() {
        let server = ServerConfig {
            workers: 3,
            max_cron_threads: 1,
            ..ServerConfig::default()
        };
        assert_eq!(
            worker_plan(&server),
            vec![
                WorkerKind::Http,
                WorkerKind::Http,
                WorkerKind::Http,
                WorkerKind::Cron
            ]
        );
    }

    #[test]
    fn test_worker_plan_without_cron() {
        let server = ServerConfig {
            workers: 1,
            max_cron_threads: 0,
            ..ServerConfig::default()
        };
        assert_eq!(worker_plan(&server), vec![WorkerKind::Http]);
    }
}
