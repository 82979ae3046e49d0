//! caravel-registry — tracks which remote providers are alive.
//!
//! An owned, lock-internal table of connected provider handles. A
//! background sweep probes each provider's session on a fixed interval
//! and evicts providers whose last successful probe is older than the
//! TTL. Probes run *outside* the lock — a slow provider must never block
//! concurrent `get`/`add` calls for the duration of a sweep pass.

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::ProviderRegistry;
