//! Admission control for incoming requests.

mod backend;
mod counter;
mod limiter;

pub use backend::AdmissionControl;
pub use limiter::RateLimiter;
