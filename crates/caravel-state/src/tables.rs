//! redb table definitions for the state store.
//!
//! All tables use `&str` keys and `&[u8]` values (JSON-serialized domain
//! types). Service keys embed a zero-padded index so prefix scans return
//! a deployment's services in declaration order.

use redb::TableDefinition;

/// Deployment rows (services stripped) keyed by `{deployment_id}`.
pub const DEPLOYMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("deployments");

/// Service rows keyed by `{deployment_id}:{index:04}`.
pub const SERVICES: TableDefinition<&str, &[u8]> = TableDefinition::new("services");

/// Provider rows keyed by `{provider_id}`.
pub const PROVIDERS: TableDefinition<&str, &[u8]> = TableDefinition::new("providers");
