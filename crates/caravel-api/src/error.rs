//! Errors crossing the manager ⇄ provider boundary.
//!
//! Provider-side implementations map their concrete errors into this
//! taxonomy before they cross the RPC surface, the same way a transport
//! would map them into status codes.

use thiserror::Error;

/// Result type alias for provider API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy of the provider API surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete deployment. Never retried.
    #[error("validation: {0}")]
    Validation(String),

    /// No live handle for the target provider; retry after re-registration.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// A backend resource operation failed. Retry by re-invoking the
    /// whole operation; upserts make that safe.
    #[error("backend: {0}")]
    Backend(String),

    /// Backend state failed an integrity check during read-back.
    #[error("inconsistent backend state: {0}")]
    Inconsistent(String),

    #[error("internal: {0}")]
    Internal(String),
}
