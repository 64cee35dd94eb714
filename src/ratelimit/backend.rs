//! Admission control capability consumed by the request-handling layer.

use crate::error::RateLimitExceeded;

/// Trait for admission gates.
///
/// The HTTP middleware works against this trait so it does not depend on
/// the concrete limiter.
pub trait AdmissionControl: Send + Sync {
    /// Admit one unit of work, or report that the budget is spent.
    ///
    /// Never blocks.
    fn allow(&self) -> Result<(), RateLimitExceeded>;
}
