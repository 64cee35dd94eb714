//! Error types for the Ipgeo service.

use std::time::Duration;
use thiserror::Error;

/// Main error type for service assembly and startup.
#[derive(Error, Debug)]
pub enum IpgeoError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset could not be loaded into a lookup backend
    #[error("Dataset load error: {0}")]
    Load(#[from] LoadError),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for IpgeoError {
    fn from(err: config::ConfigError) -> Self {
        IpgeoError::Config(err.to_string())
    }
}

/// Result type alias for Ipgeo operations.
pub type Result<T> = std::result::Result<T, IpgeoError>;

/// The admission gate refused a unit of work.
///
/// This is an expected outcome under load. Callers reject the work and do not
/// retry internally.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rate limit exceeded")]
pub struct RateLimitExceeded {
    /// Time left until the current window ends.
    pub retry_after: Duration,
}

/// Failure to resolve an address to a location.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// The input is not a syntactically valid IPv4 or IPv6 literal
    #[error("invalid IP address")]
    InvalidAddress,

    /// The address is valid but has no entry
    #[error("IP address not found")]
    NotFound,
}

/// Failure to build a lookup backend from its dataset.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("error opening dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("error reading dataset: {0}")]
    Csv(#[from] csv::Error),

    /// A record did not have exactly `address,city,country`
    #[error("invalid record on line {line}: expected 3 columns (ip,city,country), found {fields}")]
    MalformedRecord { line: u64, fields: usize },
}
