//! caravel-backend — the cluster-facing resource model.
//!
//! The reconciliation engine does not talk to a concrete cluster API; it
//! emits and reads the declarative resource descriptions defined here
//! through the [`BackendClient`] trait. A real implementation fronts a
//! Kubernetes-compatible API server; [`MemoryBackend`] backs tests and the
//! standalone daemon mode.
//!
//! # Resources
//!
//! - **`Namespace`** — per-deployment isolation scope
//! - **`NetworkPolicy`** — tenant traffic isolation rules
//! - **`Workload`** — replicated or stateful container workload
//! - **`ClusterService`** — cluster-local or node-port exposure
//! - **`NodeInfo`** — node capacity feed for statistics

pub mod client;
pub mod memory;
pub mod resources;

pub use client::{BackendClient, BackendError, BackendResult};
pub use memory::{MemoryBackend, OpCounts};
pub use resources::*;
