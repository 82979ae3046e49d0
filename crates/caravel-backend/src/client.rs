//! The backend client trait.
//!
//! Every method is a bounded blocking I/O call from the caller's point of
//! view; cancellation propagates by dropping the future. `get_*` methods
//! return `Ok(None)` for absence — only transport or API failures are
//! errors, because absence is the one branch that triggers creation
//! during an upsert.

use async_trait::async_trait;
use thiserror::Error;

use crate::resources::{ClusterService, Namespace, NetworkPolicy, NodeInfo, Workload};

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors from the backend API, carrying the failing resource kind and name.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{kind} {name}: api error: {message}")]
    Api {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("{kind} {name}: not found")]
    NotFound { kind: &'static str, name: String },
}

impl BackendError {
    pub fn api(kind: &'static str, name: &str, message: impl Into<String>) -> Self {
        Self::Api {
            kind,
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

/// Declarative resource API of one container-orchestration cluster.
#[async_trait]
pub trait BackendClient: Send + Sync {
    // ── Namespaces ─────────────────────────────────────────────────

    async fn get_namespace(&self, name: &str) -> BackendResult<Option<Namespace>>;
    async fn create_namespace(&self, namespace: &Namespace) -> BackendResult<()>;
    async fn update_namespace(&self, namespace: &Namespace) -> BackendResult<()>;
    /// Delete a namespace, cascading all namespaced resources.
    /// Returns false if the namespace did not exist.
    async fn delete_namespace(&self, name: &str) -> BackendResult<bool>;

    // ── Network policies ───────────────────────────────────────────

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> BackendResult<Option<NetworkPolicy>>;
    async fn create_network_policy(&self, policy: &NetworkPolicy) -> BackendResult<()>;
    async fn update_network_policy(&self, policy: &NetworkPolicy) -> BackendResult<()>;

    // ── Workloads ──────────────────────────────────────────────────

    async fn get_workload(&self, namespace: &str, name: &str)
    -> BackendResult<Option<Workload>>;
    async fn create_workload(&self, workload: &Workload) -> BackendResult<()>;
    async fn update_workload(&self, workload: &Workload) -> BackendResult<()>;
    async fn list_workloads(&self, namespace: &str) -> BackendResult<Vec<Workload>>;

    // ── Cluster services ───────────────────────────────────────────

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> BackendResult<Option<ClusterService>>;
    async fn create_service(&self, service: &ClusterService) -> BackendResult<()>;
    async fn update_service(&self, service: &ClusterService) -> BackendResult<()>;
    async fn list_services(&self, namespace: &str) -> BackendResult<Vec<ClusterService>>;

    // ── Nodes ──────────────────────────────────────────────────────

    async fn list_nodes(&self) -> BackendResult<Vec<NodeInfo>>;
}
