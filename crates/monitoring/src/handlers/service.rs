use bytes::Bytes;
use common::errors::ServerError;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument, Level, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::dummy::{self, DummyRoute};
use crate::db::perf::{self, RequestPerf};
use crate::models::dummy::DummyWorkload;
use crate::telemetry::HttpMetrics;

pub type HttpResponse = Response<BoxBody<Bytes, hyper::Error>>;

fn text(status: StatusCode, body: &'static str) -> HttpResponse {
    let body = Full::new(Bytes::from_static(body.as_bytes()))
        .map_err(|never| match never {})
        .boxed();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

// Utility function to extract the context from the incoming request headers
fn extract_context_from_request<B>(req: &Request<B>) -> Context {
    global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(req.headers()))
    })
}

/// Serves one request end to end: routing, error translation, the access
/// log record and, when enabled, server spans and per-request gauges.
pub struct RequestHandler {
    workload: DummyWorkload,
    http_metrics: Option<HttpMetrics>,
    instrument_http: bool,
    served: AtomicU64,
}

impl RequestHandler {
    pub fn new(
        workload: DummyWorkload,
        http_metrics: Option<HttpMetrics>,
        instrument_http: bool,
    ) -> Self {
        Self {
            workload,
            http_metrics,
            instrument_http,
            served: AtomicU64::new(0),
        }
    }

    /// Number of requests handled so far.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    fn server_span<B>(&self, req: &Request<B>, route: Option<DummyRoute>) -> Span {
        if !self.instrument_http {
            return Span::none();
        }
        let method = req.method().as_str();
        let template = route.map(|r| r.template()).unwrap_or("unmatched");
        let span = info_span!(
            "http.request",
            otel.name = %format!("{} {}", method, template),
            otel.kind = "server",
            otel.status_code = tracing::field::Empty,
            http.request.method = %method,
            http.route = %template,
            url.path = %req.uri().path(),
            http.response.status_code = tracing::field::Empty,
        );
        if let Err(err) = span.set_parent(extract_context_from_request(req)) {
            debug!(error = ?err, "failed to attach incoming trace context");
        }
        span
    }

    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse {
        self.served.fetch_add(1, Ordering::Relaxed);

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let route = DummyRoute::parse(&method, &path);
        let span = self.server_span(&req, route);

        let request_perf = Arc::new(RequestPerf::new());
        let result = perf::scope(request_perf.clone(), async {
            match route {
                Some(route) => dummy::handle(route, &self.workload).await,
                None => Err(ServerError::NotFound {
                    method: method.to_string(),
                    path: path.clone(),
                }),
            }
        })
        .instrument(span.clone())
        .await;

        let response = match result {
            Ok(body) => text(StatusCode::OK, body),
            Err(err) => {
                span.in_scope(|| match &err {
                    ServerError::NotFound { .. } => debug!(error = %err, "no route found"),
                    err if err.is_recoverable() => warn!(error = %err, path = %path, "user error"),
                    err => error!(error = %err, path = %path, "request failed"),
                });
                err.into_response()
            }
        };

        let status = response.status();
        span.record("http.response.status_code", status.as_u16());
        if status.is_server_error() {
            span.record("otel.status_code", "ERROR");
        }

        // gauges are sampled only along with an emitted access log record
        if tracing::enabled!(target: "werkzeug", Level::INFO) {
            let snapshot = request_perf.snapshot();
            info!(
                target: "werkzeug",
                "\"{} {}\" {} - {}",
                method,
                path,
                status.as_u16(),
                snapshot
            );
            if let Some(metrics) = &self.http_metrics {
                metrics.record(&snapshot);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::tests::RecordingDatabase;
    use crate::telemetry::constants::{metrics, METER_NAME};
    use crate::telemetry::testing::{gauge_points, in_memory_provider, CapturedEvents};
    use http_body_util::BodyExt;
    use opentelemetry::metrics::MeterProvider as _;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::EnvFilter;

    fn handler(db: Arc<RecordingDatabase>) -> RequestHandler {
        RequestHandler::new(DummyWorkload::new(db), None, false)
    }

    fn get(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_pass_returns_ok() {
        let handler = handler(Arc::new(RecordingDatabase::default()));
        let response = handler.handle(get("/dummy/pass")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
        assert_eq!(handler.served(), 1);
    }

    #[tokio::test]
    async fn test_error_is_not_2xx() {
        let handler = handler(Arc::new(RecordingDatabase::default()));

        let response = handler.handle(get("/dummy/error")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = handler.handle(get("/dummy/log/error")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let handler = handler(Arc::new(RecordingDatabase::default()));
        let response = handler.handle(get("/dummy/nothing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let post = Request::builder()
            .method("POST")
            .uri("/dummy/pass")
            .body(())
            .unwrap();
        assert_eq!(handler.handle(post).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(handler.served(), 2);
    }

    #[tokio::test]
    async fn test_database_route_with_instrumentation() {
        let db = Arc::new(RecordingDatabase::default());
        let handler = RequestHandler::new(DummyWorkload::new(db.clone()), None, true);

        let response = handler.handle(get("/dummy/database/3")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(db.sums.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_request_gauges_follow_access_log() {
        let (provider, exporter) = in_memory_provider();
        let http_metrics = HttpMetrics::new(&provider.meter(METER_NAME));
        let events = CapturedEvents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(events.clone()));

        let db = Arc::new(RecordingDatabase::default());
        let handler = RequestHandler::new(DummyWorkload::new(db), Some(http_metrics), false);
        let response = handler.handle(get("/dummy/database/3")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let access_log = events
            .events()
            .into_iter()
            .find(|(_, target, _)| target == "werkzeug")
            .map(|(_, _, message)| message);
        assert!(access_log
            .is_some_and(|line| line.starts_with("\"GET /dummy/database/3\" 200 - 3 ")));

        let points = gauge_points(&provider, &exporter);
        let value = |name: &str| points.iter().find(|p| p.name == name).map(|p| p.value);
        assert_eq!(value(metrics::QUERY_COUNT), Some(3.0));
        assert_eq!(value(metrics::QUERY_TIME), Some(0.006));
        assert!(value(metrics::REMAINING_TIME).is_some_and(|v| v >= 0.0));
    }

    #[tokio::test]
    async fn test_request_gauges_skipped_when_access_log_filtered() {
        let (provider, exporter) = in_memory_provider();
        let http_metrics = HttpMetrics::new(&provider.meter(METER_NAME));
        let subscriber = tracing_subscriber::registry().with(EnvFilter::new("info,werkzeug=off"));
        let _guard = tracing::subscriber::set_default(subscriber);

        let db = Arc::new(RecordingDatabase::default());
        let handler = RequestHandler::new(DummyWorkload::new(db), Some(http_metrics), false);
        let response = handler.handle(get("/dummy/database/1")).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(gauge_points(&provider, &exporter).is_empty());
    }
}
