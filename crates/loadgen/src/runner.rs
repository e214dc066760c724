use std::future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::config::LoadConfig;
use crate::stats::Stats;
use crate::tasks::TaskSet;
use crate::user::User;
use crate::LoadError;

/// Starts users at the configured rate and keeps them running until the
/// run time elapses or Ctrl-C. Stats are logged periodically and once more
/// at the end.
pub async fn run(config: &LoadConfig) -> Result<Stats, LoadError> {
    let client = reqwest::Client::builder().build()?;
    let tasks = Arc::new(TaskSet::new()?);
    let stats = Stats::default();
    let mut users = JoinSet::new();
    let mut spawned = 0;

    let mut spawn_tick = interval_at(Instant::now(), config.spawn_period()?);
    spawn_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats_tick = interval_at(
        Instant::now() + config.stats_interval,
        config.stats_interval,
    );

    let run_time = config.run_time;
    let deadline = async move {
        match run_time {
            Some(run_time) => tokio::time::sleep(run_time).await,
            None => future::pending().await,
        }
    };
    tokio::pin!(deadline);

    info!(
        host = %config.host,
        users = config.users,
        spawn_rate = config.spawn_rate,
        "starting load"
    );

    loop {
        tokio::select! {
            _ = spawn_tick.tick(), if spawned < config.users => {
                let user = User::new(
                    spawned,
                    client.clone(),
                    config.host.clone(),
                    Arc::clone(&tasks),
                    stats.clone(),
                );
                users.spawn(user.run());
                spawned += 1;
                if spawned == config.users {
                    info!(users = spawned, "all users spawned");
                }
            }
            _ = stats_tick.tick() => stats.report().await,
            _ = &mut deadline => {
                info!("run time elapsed, stopping");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received interrupt, stopping");
                break;
            }
        }
    }

    users.shutdown().await;
    stats.report().await;
    Ok(stats)
}
