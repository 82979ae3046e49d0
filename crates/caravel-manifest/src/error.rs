//! Compiler error types.

use thiserror::Error;

/// Result type alias for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Validation failures raised before any compilation output is produced.
///
/// These are never retried — the deployment itself is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("deployment ID can not be empty")]
    EmptyDeploymentId,

    #[error("deployment must declare at least one service")]
    NoServices,

    #[error("service image can not be empty")]
    EmptyImage,
}
