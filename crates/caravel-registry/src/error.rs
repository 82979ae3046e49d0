//! Registry error types.

use thiserror::Error;

use caravel_core::ProviderId;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors from provider registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The provider is not registered, or was evicted after missing its
    /// TTL. Callers may retry after the provider reconnects.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(ProviderId),
}
