//! caravel-state — embedded state store for the manager.
//!
//! Backed by [redb](https://docs.rs/redb). Deployment rows, their service
//! rows, and provider rows are JSON-serialized into `&[u8]` value
//! columns. Services live in their own table under composite keys
//! (`{deployment_id}:{index}`) so a deployment's services can be
//! replaced atomically with the row and reassembled by prefix scan.
//!
//! Deployments are never hard-deleted: closing is a state transition and
//! closed rows stay queryable by state filter.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
