use std::fmt;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use time::macros::format_description;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::{format, time::FormatTime, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::telemetry::constants::TRACER_NAME;
use crate::telemetry::providers::TelemetryProviders;

struct BracketedTime;

impl FormatTime for BracketedTime {
    fn format_time(&self, w: &mut format::Writer<'_>) -> fmt::Result {
        let now = time::OffsetDateTime::now_utc();
        let formatted = now
            .format(&format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(w, "[{}]", formatted)
    }
}

/// `[time][level] pid db target: fields`, the layout operators grep for in
/// the host framework's logs.
struct BracketedFormatter {
    pid: u32,
    db_name: String,
}

impl<S, N> FormatEvent<S, N> for BracketedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        BracketedTime.format_time(&mut writer)?;

        let metadata = event.metadata();
        write!(
            writer,
            "[{}] {} {} {}: ",
            metadata.level().to_string().to_lowercase(),
            self.pid,
            self.db_name,
            metadata.target()
        )?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

fn console_layer<S>(db_name: &str) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .event_format(BracketedFormatter {
            pid: std::process::id(),
            db_name: db_name.to_string(),
        })
        .fmt_fields(format::DefaultFields::new())
        .with_ansi(false)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Records emitted by the exporters themselves must not be fed back into
/// the log bridge.
fn is_exporter_internal(metadata: &Metadata<'_>) -> bool {
    let target = metadata.target();
    ["opentelemetry", "hyper", "tonic", "h2", "tower"]
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Console logging for processes that do not export telemetry: the
/// supervisor and the evented and threaded modes.
pub fn init_logging(db_name: &str) {
    let result = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer(db_name))
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialized: {}", err);
    }
}

/// Console logging for a worker process, with tracing spans exported through
/// the tracer provider. When `log_bridge` is set, records are forwarded to
/// the logger provider first and printed to the console after.
pub fn init_worker_logging(db_name: &str, providers: &TelemetryProviders, log_bridge: bool) {
    let trace_layer =
        tracing_opentelemetry::layer().with_tracer(providers.tracer.tracer(TRACER_NAME));

    let bridge_layer = log_bridge.then(|| {
        OpenTelemetryTracingBridge::new(&providers.logger)
            .with_filter(filter_fn(|metadata| !is_exporter_internal(metadata)))
    });

    let result = tracing_subscriber::registry()
        .with(env_filter())
        .with(trace_layer)
        .with(bridge_layer)
        .with(console_layer(db_name))
        .try_init();
    if let Err(err) = result {
        eprintln!("logging already initialized: {}", err);
    }
}
