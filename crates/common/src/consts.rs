pub const DUMMY_SLEEP_PATH: &str = "/dummy/sleep";
pub const DUMMY_DATABASE_PATH: &str = "/dummy/database";
pub const DUMMY_PASS_PATH: &str = "/dummy/pass";
pub const DUMMY_ERROR_PATH: &str = "/dummy/error";
pub const DUMMY_LOG_WARNING_PATH: &str = "/dummy/log/warning";
pub const DUMMY_LOG_ERROR_PATH: &str = "/dummy/log/error";

pub const OK_BODY: &str = "OK";

pub const ODOO_INSTRUMENT_LOGS: &str = "ODOO_INSTRUMENT_LOGS";
pub const ODOO_INSTRUMENT_METRICS: &str = "ODOO_INSTRUMENT_METRICS";
pub const ODOO_INSTRUMENT_LIBRARIES: &str = "ODOO_INSTRUMENT_LIBRARIES";
pub const ODOO_ENVIRONMENT: &str = "ODOO_ENVIRONMENT";
pub const MONITORING_CONFIG_PATH: &str = "MONITORING_CONFIG_PATH";

pub const DEFAULT_CONFIG_PATH: &str = "./monitoring.yaml";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8069";
pub const DEFAULT_SERVICE_NAME: &str = "odoo";
pub const DEFAULT_ENVIRONMENT: &str = "unknown";
pub const DEFAULT_DATABASE_URL: &str = "host=localhost user=odoo password=odoo dbname=odoo";

/// Matches the host framework's default `limit_request`.
pub const DEFAULT_LIMIT_REQUEST: u64 = 65536;
