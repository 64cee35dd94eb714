//! Address to location resolution.
//!
//! [`LookupService`] is the capability the request-handling layer depends on.
//! [`LookupBackend`] is the closed set of implementations, picked once at
//! startup from [`BackendKind`].

mod address;
mod table;

pub use table::TableLookupService;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{BackendKind, LookupConfig};
use crate::error::{LoadError, LookupError};

/// Location associated with an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub country: String,
    pub city: String,
}

/// Trait for lookup backends.
///
/// Implementations are read-only once built and safe to call from any number
/// of threads at once.
pub trait LookupService: Send + Sync {
    /// Resolve an address to its location.
    ///
    /// Fails with [`LookupError::InvalidAddress`] if `address` is not an IPv4
    /// or IPv6 literal, and with [`LookupError::NotFound`] if it is valid but
    /// unknown.
    fn resolve(&self, address: &str) -> Result<LocationRecord, LookupError>;

    /// Number of addresses this backend can resolve.
    fn record_count(&self) -> usize;
}

/// The lookup backends available to the service.
#[derive(Debug, Clone)]
pub enum LookupBackend {
    Table(TableLookupService),
}

impl LookupBackend {
    /// Construct the backend named by the configuration.
    ///
    /// Fails without producing a backend if its data cannot be loaded.
    pub fn from_config(config: &LookupConfig) -> Result<Self, LoadError> {
        let backend = match config.backend {
            BackendKind::Table => {
                LookupBackend::Table(TableLookupService::from_path(&config.dataset_path)?)
            }
        };

        info!(
            backend = ?config.backend,
            records = backend.record_count(),
            "Lookup backend initialized"
        );
        Ok(backend)
    }
}

impl LookupService for LookupBackend {
    fn resolve(&self, address: &str) -> Result<LocationRecord, LookupError> {
        match self {
            LookupBackend::Table(service) => service.resolve(address),
        }
    }

    fn record_count(&self) -> usize {
        match self {
            LookupBackend::Table(service) => service.record_count(),
        }
    }
}
