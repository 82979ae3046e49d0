//! Manager error types.

use thiserror::Error;

use caravel_api::ApiError;
use caravel_core::DeploymentId;
use caravel_registry::RegistryError;
use caravel_state::StateError;

/// Result type alias for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors from lifecycle orchestration.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Provider(#[from] RegistryError),

    /// The remote provider call failed; nothing was persisted for
    /// creates, and the stored row is untouched for updates.
    #[error("provider call failed: {0}")]
    Rpc(#[from] ApiError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("deployment not found: {0}")]
    NotFound(DeploymentId),

    /// Close is terminal; no further mutation is permitted.
    #[error("deployment is closed: {0}")]
    DeploymentClosed(DeploymentId),

    #[error("incompatible provider api version: {remote} (expected {local})")]
    IncompatibleVersion { remote: String, local: String },
}
