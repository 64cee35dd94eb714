//! Middleware applied around the API routes.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::MakeSpan;
use tracing::Span;

use super::response::ApiError;
use super::AppState;
use crate::config::CorsConfig;
use crate::error::{IpgeoError, Result};
use crate::ratelimit::AdmissionControl;

/// How long browsers may cache a preflight response.
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Reject the request with 429 when the admission gate refuses it.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match state.limiter.allow() {
        Ok(()) => next.run(request).await,
        Err(exceeded) => ApiError::from(exceeded).into_response(),
    }
}

/// Build the CORS layer for the configured origins.
///
/// Credentials are allowed, so a wildcard origin is refused.
pub fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| {
            if origin == "*" {
                return Err(IpgeoError::Config(
                    "wildcard CORS origin cannot be used with credentials".to_string(),
                ));
            }
            HeaderValue::from_str(origin)
                .map_err(|e| IpgeoError::Config(format!("invalid CORS origin {origin:?}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE))
}

/// Answer with 408 when a request runs longer than `timeout`.
#[allow(deprecated)]
pub fn request_timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::new(timeout)
}

/// Span for one request, carrying the peer address when the server
/// provides it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let remote = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            remote = ?remote,
        )
    }
}

/// Security headers set on every response unless a handler already set them.
pub const SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains; preload",
    ),
    (header::REFERRER_POLICY, "same-origin"),
];

/// One response-header layer per entry in [`SECURITY_HEADERS`].
pub fn security_headers() -> impl Iterator<Item = SetResponseHeaderLayer<HeaderValue>> {
    SECURITY_HEADERS.into_iter().map(|(name, value)| {
        SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
    })
}
