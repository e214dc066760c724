use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::{Error as HyperError, Response, StatusCode};
use serde_json::json;
use thiserror::Error;

/// Errors a request handler can raise. Handlers never recover locally; every
/// error is translated to an HTTP response in one place.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Business error shown to the caller, logged at warn.
    #[error("{0}")]
    User(String),

    /// Unhandled failure, logged at error.
    #[error("{0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("no route for {method} {path}")]
    NotFound { method: String, path: String },
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::User(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) | ServerError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::User(_) => "UserError",
            ServerError::Internal(_) => "InternalServerError",
            ServerError::Database(_) => "DatabaseError",
            ServerError::NotFound { .. } => "NotFound",
        }
    }

    /// Recoverable errors are the ones a caller can fix or ignore.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServerError::User(_) | ServerError::NotFound { .. })
    }

    pub fn into_response(self) -> Response<BoxBody<Bytes, HyperError>> {
        let body_json = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        let boxed_body = Full::new(Bytes::from(body_json.to_string()))
            .map_err(|never| match never {})
            .boxed();

        Response::builder()
            .status(self.status())
            .header("content-type", "application/json")
            .body(boxed_body)
            .unwrap_or_else(|_| {
                Response::new(
                    Full::new(Bytes::from("Internal Error"))
                        .map_err(|never| match never {})
                        .boxed(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_user_error_format() {
        let response = ServerError::User("ERROR".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

        assert_eq!(body["error"]["code"], "UserError");
        assert_eq!(body["error"]["message"], "ERROR");
    }

    #[tokio::test]
    async fn test_internal_error_is_500() {
        let err = ServerError::Internal("boom".to_string());
        assert!(!err.is_recoverable());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_message() {
        let err = ServerError::NotFound {
            method: "POST".to_string(),
            path: "/dummy/pass".to_string(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "no route for POST /dummy/pass");
    }
}
