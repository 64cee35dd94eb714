//! Request handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::response::ApiError;
use super::AppState;
use crate::lookup::{LocationRecord, LookupService};

/// Query params for `/v1/find-country`.
#[derive(Debug, Deserialize)]
pub struct FindCountryParams {
    pub ip: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: usize,
}

/// Resolve the `ip` query parameter to its country and city.
pub async fn find_country(
    State(state): State<AppState>,
    Query(params): Query<FindCountryParams>,
) -> Result<Json<LocationRecord>, ApiError> {
    let ip = match params.ip.as_deref() {
        Some(ip) if !ip.is_empty() => ip,
        _ => return Err(ApiError::MissingAddress),
    };

    let record = state.lookup.resolve(ip).map_err(|e| {
        debug!(ip, error = %e, "Lookup failed");
        ApiError::from(e)
    })?;

    Ok(Json(record))
}

/// Liveness check that also reports the loaded table size.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        records: state.lookup.record_count(),
    })
}
