//! Provider engine error types.

use thiserror::Error;

use caravel_api::ApiError;
use caravel_backend::BackendError;
use caravel_manifest::CompileError;

/// Result type alias for provider-side operations.
pub type ApplyResult<T> = Result<T, ApplyError>;

/// Errors raised while compiling, applying, or reading back a deployment.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Settings failed validation; nothing was applied.
    #[error("invalid provider settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Backend state failed an integrity check during read-back, e.g. a
    /// workload with zero containers or zero status conditions.
    #[error("inconsistent backend state: {0}")]
    Inconsistent(String),
}

impl From<ApplyError> for ApiError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::InvalidSettings(msg) => ApiError::Internal(msg),
            ApplyError::Compile(e) => ApiError::Validation(e.to_string()),
            ApplyError::Backend(e) => ApiError::Backend(e.to_string()),
            ApplyError::Inconsistent(msg) => ApiError::Inconsistent(msg),
        }
    }
}
