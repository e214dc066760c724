//! OpenTelemetry Semantic Conventions and instrument names
//!
//! This module defines the attribute keys and metric names emitted by the
//! service. HTTP and database keys follow the stable semantic conventions.
//! See: https://opentelemetry.io/docs/specs/semconv/

/// Name of the meter every instrument is created from.
pub const METER_NAME: &str = "odoo";

/// Name of the tracer used for server and database spans.
pub const TRACER_NAME: &str = "odoo";

// =============================================================================
// Resource Attributes
// =============================================================================

pub mod resource {
    pub const SERVICE_NAME: &str = "service.name";

    /// Host node name the process runs on
    pub const SERVICE_NAMESPACE: &str = "service.namespace";

    pub const SERVICE_VERSION: &str = "service.version";

    /// Random identifier, regenerated for every worker process
    pub const SERVICE_INSTANCE_ID: &str = "service.instance.id";

    /// Value of `ODOO_ENVIRONMENT`
    pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

    /// Process id of the worker
    pub const WORKER: &str = "worker";
}

// =============================================================================
// Span Attributes - HTTP
// =============================================================================

pub mod http {
    /// Example: "GET"
    pub const REQUEST_METHOD: &str = "http.request.method";

    /// Example: 200, 500
    pub const RESPONSE_STATUS_CODE: &str = "http.response.status_code";

    /// Matched route template
    /// Example: "/dummy/sleep/{seconds}"
    pub const ROUTE: &str = "http.route";

    pub const URL_PATH: &str = "url.path";
}

// =============================================================================
// Span Attributes - Database
// =============================================================================

pub mod db {
    pub const SYSTEM_NAME: &str = "db.system.name";

    pub const SYSTEM_POSTGRESQL: &str = "postgresql";

    pub const NAMESPACE: &str = "db.namespace";

    pub const QUERY_TEXT: &str = "db.query.text";
}

// =============================================================================
// Metrics
// =============================================================================

pub mod metrics {
    /// Observable gauge reporting 1 while the process is up
    pub const DEPLOYMENT_INFO: &str = "odoo.deployment_info";
    pub const DEPLOYMENT_INFO_DESCRIPTION: &str = "Basic deployment information / presence check";

    /// Attribute on `odoo.deployment_info`
    pub const MAJOR_VERSION: &str = "major_version";

    pub const QUERY_COUNT: &str = "odoo.query_count";
    pub const QUERY_COUNT_DESCRIPTION: &str = "Number of SQL queries performed during the request";

    pub const QUERY_TIME: &str = "odoo.query_time";
    pub const QUERY_TIME_DESCRIPTION: &str = "Time spent performing SQL queries during the request";

    pub const REMAINING_TIME: &str = "odoo.remaining_time";
    pub const REMAINING_TIME_DESCRIPTION: &str =
        "Time spent not performing SQL queries during the request";

    pub const CRON_DURATION: &str = "odoo.cron.duration";
    pub const CRON_DURATION_DESCRIPTION: &str = "Duration of scheduled job runs";

    pub const CRON_FAILURES: &str = "odoo.cron.failures";
    pub const CRON_FAILURES_DESCRIPTION: &str = "Number of failed scheduled job runs";

    /// Attribute on cron instruments
    pub const CRON_JOB: &str = "job";
}
