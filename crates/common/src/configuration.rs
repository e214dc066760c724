use duration_string::DurationString;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;

use crate::consts::{
    DEFAULT_BIND_ADDRESS, DEFAULT_DATABASE_URL, DEFAULT_ENVIRONMENT, DEFAULT_LIMIT_REQUEST,
    DEFAULT_SERVICE_NAME, ODOO_ENVIRONMENT, ODOO_INSTRUMENT_LIBRARIES, ODOO_INSTRUMENT_LOGS,
    ODOO_INSTRUMENT_METRICS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    DurationString::deserialize(deserializer).map(Duration::from)
}

/// How the server distributes work, resolved once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    /// Single process, HTTP serving and cron share one async runtime.
    Evented,
    /// A supervisor spawns HTTP and cron worker processes.
    #[default]
    Prefork,
    /// Single process without worker processes; telemetry is not supported.
    Threaded,
}

impl Display for ServerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerMode::Evented => write!(f, "evented"),
            ServerMode::Prefork => write!(f, "prefork"),
            ServerMode::Threaded => write!(f, "threaded"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub mode: ServerMode,
    pub workers: u32,
    pub max_cron_threads: u32,
    pub limit_request: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            mode: ServerMode::default(),
            workers: 2,
            max_cron_threads: 1,
            limit_request: DEFAULT_LIMIT_REQUEST,
        }
    }
}

impl ServerConfig {
    /// Prefork without any HTTP worker falls back to threaded, like the host
    /// framework does when `workers` is zero.
    pub fn effective_mode(&self) -> ServerMode {
        match self.mode {
            ServerMode::Prefork if self.workers == 0 => ServerMode::Threaded,
            mode => mode,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub connection_string: String,
    /// Name reported in log records, `-` when unset.
    pub name: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: DEFAULT_DATABASE_URL.to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CronAction {
    DatabaseWork { iterations: i64 },
    Sleep { seconds: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub name: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
    pub action: CronAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    /// How often the cron worker wakes up to look for due jobs.
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    pub jobs: Vec<CronJob>,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            jobs: vec![CronJob {
                name: "dummy_database".to_string(),
                interval: Duration::from_secs(300),
                action: CronAction::DatabaseWork { iterations: 100 },
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExporterKind {
    #[default]
    Otlp,
    Stdout,
    /// Providers are built without exporters.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub exporter: ExporterKind,
    /// Overrides `OTEL_EXPORTER_OTLP_ENDPOINT` when set.
    pub otlp_endpoint: Option<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub metric_export_interval: Duration,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            exporter: ExporterKind::default(),
            otlp_endpoint: None,
            metric_export_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cron: CronConfig,
    pub telemetry: TelemetryConfig,
}

impl Configuration {
    /// Loads the YAML configuration at `path`. A missing file yields the
    /// defaults so the service can start with environment variables alone.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: display,
                    source,
                })
            }
        };
        Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }
}

/// The instrumentation switches read from the environment, resolved once at
/// startup and handed to every worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentOptions {
    pub logs: bool,
    pub metrics: bool,
    pub libraries: Vec<String>,
    pub environment: String,
}

impl InstrumentOptions {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// A flag counts as set when present and non-empty.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).is_some_and(|value| !value.is_empty());

        let libraries = lookup(ODOO_INSTRUMENT_LIBRARIES)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            logs: flag(ODOO_INSTRUMENT_LOGS),
            metrics: flag(ODOO_INSTRUMENT_METRICS),
            libraries,
            // an empty value is kept as is
            environment: lookup(ODOO_ENVIRONMENT)
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        }
    }

    pub fn is_inert(&self) -> bool {
        !self.logs && !self.metrics && self.libraries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_deserialize_configuration() {
        let config = Configuration::from_yaml(
            r#"
server:
  bind_address: "127.0.0.1:9000"
  mode: evented
  workers: 4
database:
  connection_string: "host=db user=odoo"
  name: demo
cron:
  poll_interval: 10s
  jobs:
    - name: nightly
      interval: 1h
      action:
        type: sleep
        seconds: 3
telemetry:
  exporter: none
  metric_export_interval: 15s
"#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.server.mode, ServerMode::Evented);
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.server.max_cron_threads, 1);
        assert_eq!(config.database.name.as_deref(), Some("demo"));
        assert_eq!(config.cron.poll_interval, Duration::from_secs(10));
        assert_eq!(config.cron.jobs.len(), 1);
        assert_eq!(config.cron.jobs[0].interval, Duration::from_secs(3600));
        assert_eq!(config.cron.jobs[0].action, CronAction::Sleep { seconds: 3 });
        assert_eq!(config.telemetry.exporter, ExporterKind::None);
        assert_eq!(config.telemetry.service_name, "odoo");
        assert_eq!(
            config.telemetry.metric_export_interval,
            Duration::from_secs(15)
        );
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Configuration::from_yaml("{}").unwrap();
        assert_eq!(config.server.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.server.mode, ServerMode::Prefork);
        assert_eq!(config.telemetry.exporter, ExporterKind::Otlp);
        assert_eq!(config.cron.jobs[0].name, "dummy_database");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Configuration::load("/nonexistent/monitoring.yaml").unwrap();
        assert_eq!(config.server.workers, 2);
    }

    #[test]
    fn test_zero_workers_is_threaded() {
        let server = ServerConfig {
            workers: 0,
            ..ServerConfig::default()
        };
        assert_eq!(server.effective_mode(), ServerMode::Threaded);

        let evented = ServerConfig {
            workers: 0,
            mode: ServerMode::Evented,
            ..ServerConfig::default()
        };
        assert_eq!(evented.effective_mode(), ServerMode::Evented);
    }

    #[test]
    fn test_instrument_options_all_unset() {
        let options = InstrumentOptions::from_lookup(|_| None);
        assert!(options.is_inert());
        assert_eq!(options.environment, "unknown");
    }

    #[test]
    fn test_instrument_options_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ODOO_INSTRUMENT_LOGS, "1"),
            (ODOO_INSTRUMENT_METRICS, ""),
            (ODOO_INSTRUMENT_LIBRARIES, "wsgi, psycopg2,,redis"),
            (ODOO_ENVIRONMENT, "staging"),
        ]);
        let options = InstrumentOptions::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert!(options.logs);
        // empty value behaves as unset
        assert!(!options.metrics);
        assert_eq!(options.libraries, vec!["wsgi", "psycopg2", "redis"]);
        assert_eq!(options.environment, "staging");
        assert!(!options.is_inert());
    }

    #[test]
    fn test_empty_environment_is_kept() {
        let options = InstrumentOptions::from_lookup(|key| {
            (key == ODOO_ENVIRONMENT).then(String::new)
        });
        assert_eq!(options.environment, "");
    }

    #[test]
    #[serial]
    fn test_instrument_options_from_env() {
        std::env::set_var(ODOO_INSTRUMENT_METRICS, "true");
        std::env::remove_var(ODOO_INSTRUMENT_LOGS);
        std::env::remove_var(ODOO_INSTRUMENT_LIBRARIES);
        let options = InstrumentOptions::from_env();
        std::env::remove_var(ODOO_INSTRUMENT_METRICS);

        assert!(options.metrics);
        assert!(!options.logs);
        assert!(options.libraries.is_empty());
    }
}
