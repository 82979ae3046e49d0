//! caravel-provider — the provider-side engine.
//!
//! Translates compiled workload groups into backend resources and keeps
//! the cluster converged with them. The apply path is strictly ordered
//! per deployment and idempotent end to end:
//!
//! ```text
//! ProviderEngine (implements ProviderApi)
//!   ├── compile (caravel-manifest)
//!   ├── apply
//!   │   ├── 1. namespace            (upsert; failure aborts)
//!   │   ├── 2. network policies    (upsert each; failure aborts)
//!   │   ├── 3. per-service workload (replicated | stateful)
//!   │   └── 4. service exposure     (cluster-local, node-port)
//!   └── read-back
//!       └── workloads + services → abstract Deployment status
//! ```
//!
//! Upsert means get → create-if-absent, merge-and-update-if-present.
//! Nothing is retried internally; re-invoking `apply` converges.

pub mod apply;
pub mod builders;
pub mod engine;
pub mod error;
pub mod naming;
pub mod readback;
pub mod settings;

pub use engine::ProviderEngine;
pub use error::{ApplyError, ApplyResult};
pub use settings::ProviderSettings;
