//! HTTP boundary: routes requests through the rate limiter to the lookup
//! backend and maps results to JSON responses.

mod handlers;
mod middleware;
mod response;
mod routes;
mod server;

pub use response::ApiError;
pub use routes::create_router;
pub use server::HttpServer;

use std::sync::Arc;

use crate::lookup::LookupService;
use crate::ratelimit::AdmissionControl;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<dyn LookupService>,
    pub limiter: Arc<dyn AdmissionControl>,
}

impl AppState {
    pub fn new(lookup: Arc<dyn LookupService>, limiter: Arc<dyn AdmissionControl>) -> Self {
        Self { lookup, limiter }
    }
}
