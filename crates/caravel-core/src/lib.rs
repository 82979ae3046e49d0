//! caravel-core — domain types shared across the Caravel control plane.
//!
//! A `Deployment` is a tenant's declarative request for one or more running
//! `Service`s. The manager assigns it to a `Provider` (a remote execution
//! backend fronting one container cluster), which compiles and applies it.
//!
//! All types here are plain data: serializable, no I/O, no backend coupling.

pub mod patch;
pub mod types;

pub use patch::ServicePatch;
pub use types::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in whole seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
