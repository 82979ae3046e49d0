//! caravel-manifest — compiles abstract deployments into workload groups.
//!
//! The compiler is a pure transformation: a `Deployment` (from
//! `caravel-core`) goes in, a backend-ready `WorkloadGroup` comes out. It
//! never touches the backend, and it is recomputed on every apply — the
//! group is a derived artifact, never persisted.
//!
//! # Components
//!
//! - **`units`** — milli-core / byte arithmetic and overcommit factors
//! - **`group`** — the compiled workload group model
//! - **`compile`** — validation and the deployment → group transformation

pub mod compile;
pub mod error;
pub mod group;
pub mod units;

pub use compile::compile;
pub use error::{CompileError, CompileResult};
pub use group::{Protocol, ServiceExpose, Workload, WorkloadGroup};
pub use units::{CommitLevels, ResourcePair, ResourceUnits, StorageUnits};
