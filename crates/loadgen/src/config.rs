use duration_string::DurationString;
use std::str::FromStr;
use std::time::Duration;

use crate::LoadError;

pub const LOADGEN_HOST: &str = "LOADGEN_HOST";
pub const LOADGEN_USERS: &str = "LOADGEN_USERS";
pub const LOADGEN_SPAWN_RATE: &str = "LOADGEN_SPAWN_RATE";
pub const LOADGEN_RUN_TIME: &str = "LOADGEN_RUN_TIME";
pub const LOADGEN_STATS_INTERVAL: &str = "LOADGEN_STATS_INTERVAL";

/// Load run settings. Every field has a default and can be overridden with
/// a `LOADGEN_*` variable.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub host: String,
    pub users: usize,
    /// Users started per second.
    pub spawn_rate: f64,
    /// Stop after this long; run until Ctrl-C when unset.
    pub run_time: Option<Duration>,
    pub stats_interval: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            host: "http://odoo:8069".to_string(),
            users: 5,
            spawn_rate: 1.0,
            run_time: None,
            stats_interval: Duration::from_secs(2),
        }
    }
}

impl LoadConfig {
    pub fn from_env() -> Result<Self, LoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = lookup(LOADGEN_HOST) {
            config.host = host.trim().trim_end_matches('/').to_string();
        }
        if let Some(users) = lookup(LOADGEN_USERS) {
            config.users = parse(LOADGEN_USERS, &users)?;
        }
        if let Some(rate) = lookup(LOADGEN_SPAWN_RATE) {
            config.spawn_rate = parse(LOADGEN_SPAWN_RATE, &rate)?;
        }
        if let Some(run_time) = lookup(LOADGEN_RUN_TIME) {
            config.run_time = Some(parse_duration(LOADGEN_RUN_TIME, &run_time)?);
        }
        if let Some(interval) = lookup(LOADGEN_STATS_INTERVAL) {
            config.stats_interval = parse_duration(LOADGEN_STATS_INTERVAL, &interval)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LoadError> {
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(LoadError::Config {
                name: LOADGEN_SPAWN_RATE,
                reason: "must be a positive number".to_string(),
            });
        }
        self.spawn_period()?;
        if self.stats_interval.is_zero() {
            return Err(LoadError::Config {
                name: LOADGEN_STATS_INTERVAL,
                reason: "must not be zero".to_string(),
            });
        }
        Ok(())
    }

    /// Delay between two user starts.
    pub fn spawn_period(&self) -> Result<Duration, LoadError> {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|err| LoadError::Config {
            name: LOADGEN_SPAWN_RATE,
            reason: err.to_string(),
        })
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, LoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| LoadError::Config {
        name,
        reason: err.to_string(),
    })
}

fn parse_duration(name: &'static str, value: &str) -> Result<Duration, LoadError> {
    DurationString::try_from(value.trim().to_string())
        .map(Duration::from)
        .map_err(|err| LoadError::Config {
            name,
            reason: format!("{:?}", err),
        })
}
