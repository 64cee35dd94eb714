//! Error responses returned by the HTTP boundary.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

use crate::error::{LookupError, RateLimitExceeded};

/// JSON body for every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Failures a request can end in, mapped to status codes.
#[derive(Debug)]
pub enum ApiError {
    MissingAddress,
    Lookup(LookupError),
    RateLimited(RateLimitExceeded),
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        ApiError::Lookup(err)
    }
}

impl From<RateLimitExceeded> for ApiError {
    fn from(err: RateLimitExceeded) -> Self {
        ApiError::RateLimited(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingAddress => (StatusCode::BAD_REQUEST, "Missing 'ip' parameter"),
            ApiError::Lookup(LookupError::InvalidAddress) => {
                (StatusCode::BAD_REQUEST, "Invalid IP address")
            }
            ApiError::Lookup(LookupError::NotFound) => {
                (StatusCode::NOT_FOUND, "IP address not found")
            }
            ApiError::RateLimited(err) => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorBody {
                        error: "Too many requests",
                    }),
                )
                    .into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(err.retry_after)),
                );
                return response;
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Whole seconds a client should wait, rounded up and never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), 2);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::MissingAddress.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LookupError::InvalidAddress).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(LookupError::NotFound).into_response().status(),
            StatusCode::NOT_FOUND
        );

        let response = ApiError::from(RateLimitExceeded {
            retry_after: Duration::from_millis(300),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
