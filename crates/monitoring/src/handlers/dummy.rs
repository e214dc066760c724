use common::consts::{
    DUMMY_DATABASE_PATH, DUMMY_ERROR_PATH, DUMMY_LOG_ERROR_PATH, DUMMY_LOG_WARNING_PATH,
    DUMMY_PASS_PATH, DUMMY_SLEEP_PATH, OK_BODY,
};
use common::errors::ServerError;
use hyper::Method;

use crate::models::dummy::DummyWorkload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyRoute {
    Sleep(i64),
    Database(i64),
    Pass,
    Error,
    LogWarning,
    LogError,
}

impl DummyRoute {
    /// Matches a GET path against the dummy routes. Integer segments accept
    /// digits only, anything else does not match.
    pub fn parse(method: &Method, path: &str) -> Option<Self> {
        if *method != Method::GET {
            return None;
        }
        match path {
            DUMMY_PASS_PATH => return Some(DummyRoute::Pass),
            DUMMY_ERROR_PATH => return Some(DummyRoute::Error),
            DUMMY_LOG_WARNING_PATH => return Some(DummyRoute::LogWarning),
            DUMMY_LOG_ERROR_PATH => return Some(DummyRoute::LogError),
            _ => {}
        }
        if let Some(seconds) = int_segment(path, DUMMY_SLEEP_PATH) {
            return Some(DummyRoute::Sleep(seconds));
        }
        int_segment(path, DUMMY_DATABASE_PATH).map(DummyRoute::Database)
    }

    /// Route template used for span names and the `http.route` attribute.
    pub fn template(&self) -> &'static str {
        match self {
            DummyRoute::Sleep(_) => "/dummy/sleep/{seconds}",
            DummyRoute::Database(_) => "/dummy/database/{iterations}",
            DummyRoute::Pass => DUMMY_PASS_PATH,
            DummyRoute::Error => DUMMY_ERROR_PATH,
            DummyRoute::LogWarning => DUMMY_LOG_WARNING_PATH,
            DummyRoute::LogError => DUMMY_LOG_ERROR_PATH,
        }
    }
}

fn int_segment(path: &str, prefix: &str) -> Option<i64> {
    let segment = path.strip_prefix(prefix)?.strip_prefix('/')?;
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Runs the handler for `route`. Errors are raised as-is for the caller to
/// translate.
pub async fn handle(
    route: DummyRoute,
    workload: &DummyWorkload,
) -> Result<&'static str, ServerError> {
    match route {
        DummyRoute::Sleep(seconds) => {
            workload.sleep(seconds).await?;
            Ok(OK_BODY)
        }
        DummyRoute::Database(iterations) => {
            workload.database_work(iterations).await?;
            Ok(OK_BODY)
        }
        DummyRoute::Pass => Ok(OK_BODY),
        DummyRoute::Error => Err(ServerError::User("ERROR".to_string())),
        DummyRoute::LogWarning => Err(ServerError::User("WARNING".to_string())),
        DummyRoute::LogError => Err(ServerError::Internal("ERROR".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::tests::RecordingDatabase;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_parse_routes() {
        let get = Method::GET;
        assert_eq!(DummyRoute::parse(&get, "/dummy/pass"), Some(DummyRoute::Pass));
        assert_eq!(
            DummyRoute::parse(&get, "/dummy/sleep/3"),
            Some(DummyRoute::Sleep(3))
        );
        assert_eq!(
            DummyRoute::parse(&get, "/dummy/database/250"),
            Some(DummyRoute::Database(250))
        );
        assert_eq!(
            DummyRoute::parse(&get, "/dummy/log/warning"),
            Some(DummyRoute::LogWarning)
        );
        assert_eq!(
            DummyRoute::parse(&get, "/dummy/log/error"),
            Some(DummyRoute::LogError)
        );
    }

    #[test]
    fn test_parse_rejects_non_matching() {
        let get = Method::GET;
        assert_eq!(DummyRoute::parse(&Method::POST, "/dummy/pass"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy/sleep/"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy/sleep/-1"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy/sleep/abc"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy/database/1/2"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy/sleeping/3"), None);
        assert_eq!(DummyRoute::parse(&get, "/dummy"), None);
    }

    #[tokio::test]
    async fn test_pass_has_no_side_effects() {
        let db = Arc::new(RecordingDatabase::default());
        let workload = DummyWorkload::new(db.clone());

        assert_eq!(handle(DummyRoute::Pass, &workload).await.unwrap(), "OK");
        assert!(db.sleeps.lock().unwrap().is_empty());
        assert!(db.sums.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_routes_always_raise() {
        let workload = DummyWorkload::new(Arc::new(RecordingDatabase::default()));

        let err = handle(DummyRoute::Error, &workload).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(!err.status().is_success());

        let err = handle(DummyRoute::LogWarning, &workload).await.unwrap_err();
        assert!(err.is_recoverable());

        let err = handle(DummyRoute::LogError, &workload).await.unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(err.status(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_database_route_issues_round_trips() {
        let db = Arc::new(RecordingDatabase::default());
        let workload = DummyWorkload::new(db.clone());

        handle(DummyRoute::Database(12), &workload).await.unwrap();
        assert_eq!(db.sums.lock().unwrap().len(), 12);
    }
}
