//! Router configuration.

use axum::routing::get;
use axum::{middleware as axum_middleware, Router};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::middleware::{cors_layer, rate_limit, request_timeout_layer, security_headers, RequestSpan};
use super::{handlers, AppState};
use crate::config::IpgeoConfig;
use crate::error::Result;

/// Create the main router with all routes.
///
/// API routes pass through the rate limiter; `/health` does not. Every
/// request is logged at `INFO` and bounded by the configured timeout.
pub fn create_router(state: AppState, config: &IpgeoConfig) -> Result<Router> {
    let api = Router::new()
        .route("/v1/find-country", get(handlers::find_country))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), rate_limit));

    let trace = TraceLayer::new_for_http()
        .make_span_with(RequestSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let mut router = Router::new()
        .merge(api)
        .route("/health", get(handlers::health))
        .layer(request_timeout_layer(config.server.request_timeout()))
        .layer(trace)
        .layer(cors_layer(&config.cors)?);

    for layer in security_headers() {
        router = router.layer(layer);
    }

    Ok(router.with_state(state))
}
