//! In-memory backend — test double and standalone-mode cluster.
//!
//! Implements [`BackendClient`] over plain maps, mimicking the API
//! semantics the apply engine relies on: create fails on conflict, update
//! fails on absence, node-port services get ports allocated by the
//! backend, and workload status is owned by the backend. Operation
//! counters let tests assert create-vs-update behavior.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::client::{BackendClient, BackendError, BackendResult};
use crate::resources::{
    ClusterService, ConditionStatus, Namespace, NetworkPolicy, NodeInfo, ServiceKind, Workload,
    WorkloadCondition, WorkloadStatus,
};

/// First node port handed out by the allocator.
const NODE_PORT_BASE: u16 = 30000;

/// Counters over mutating operations, for idempotence assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpCounts {
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
}

#[derive(Default)]
struct Inner {
    namespaces: HashMap<String, Namespace>,
    policies: HashMap<(String, String), NetworkPolicy>,
    workloads: HashMap<(String, String), Workload>,
    services: HashMap<(String, String), ClusterService>,
    nodes: Vec<NodeInfo>,
    ops: OpCounts,
    /// Monotonic clock for condition transitions — deterministic in tests.
    clock: u64,
    next_node_port: u16,
}

/// In-memory [`BackendClient`] implementation.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the node capacity feed.
    pub fn set_nodes(&self, nodes: Vec<NodeInfo>) {
        self.inner.lock().unwrap().nodes = nodes;
    }

    /// Overwrite a workload's status, e.g. to simulate a failing rollout.
    /// Returns false if the workload does not exist.
    pub fn set_workload_status(&self, namespace: &str, name: &str, status: WorkloadStatus) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .workloads
            .get_mut(&(namespace.to_string(), name.to_string()))
        {
            Some(workload) => {
                workload.status = status;
                true
            }
            None => false,
        }
    }

    /// Mutating-operation counters since construction.
    pub fn op_counts(&self) -> OpCounts {
        self.inner.lock().unwrap().ops
    }

    /// Total number of stored objects across all kinds.
    pub fn object_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.len() + inner.policies.len() + inner.workloads.len() + inner.services.len()
    }
}

#[async_trait]
impl BackendClient for MemoryBackend {
    // ── Namespaces ─────────────────────────────────────────────────

    async fn get_namespace(&self, name: &str) -> BackendResult<Option<Namespace>> {
        Ok(self.inner.lock().unwrap().namespaces.get(name).cloned())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.namespaces.contains_key(&namespace.name) {
            return Err(BackendError::api(
                "namespace",
                &namespace.name,
                "already exists",
            ));
        }
        inner
            .namespaces
            .insert(namespace.name.clone(), namespace.clone());
        inner.ops.creates += 1;
        debug!(name = %namespace.name, "namespace created");
        Ok(())
    }

    async fn update_namespace(&self, namespace: &Namespace) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.namespaces.contains_key(&namespace.name) {
            return Err(BackendError::not_found("namespace", &namespace.name));
        }
        inner
            .namespaces
            .insert(namespace.name.clone(), namespace.clone());
        inner.ops.updates += 1;
        Ok(())
    }

    async fn delete_namespace(&self, name: &str) -> BackendResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let existed = inner.namespaces.remove(name).is_some();
        if existed {
            // Deleting a namespace cascades everything inside it.
            inner.policies.retain(|(ns, _), _| ns != name);
            inner.workloads.retain(|(ns, _), _| ns != name);
            inner.services.retain(|(ns, _), _| ns != name);
            inner.ops.deletes += 1;
            debug!(%name, "namespace deleted");
        }
        Ok(existed)
    }

    // ── Network policies ───────────────────────────────────────────

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> BackendResult<Option<NetworkPolicy>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .policies
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_network_policy(&self, policy: &NetworkPolicy) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (policy.namespace.clone(), policy.name.clone());
        if inner.policies.contains_key(&key) {
            return Err(BackendError::api(
                "network policy",
                &policy.name,
                "already exists",
            ));
        }
        inner.policies.insert(key, policy.clone());
        inner.ops.creates += 1;
        Ok(())
    }

    async fn update_network_policy(&self, policy: &NetworkPolicy) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (policy.namespace.clone(), policy.name.clone());
        if !inner.policies.contains_key(&key) {
            return Err(BackendError::not_found("network policy", &policy.name));
        }
        inner.policies.insert(key, policy.clone());
        inner.ops.updates += 1;
        Ok(())
    }

    // ── Workloads ──────────────────────────────────────────────────

    async fn get_workload(
        &self,
        namespace: &str,
        name: &str,
    ) -> BackendResult<Option<Workload>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .workloads
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_workload(&self, workload: &Workload) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (workload.namespace.clone(), workload.name.clone());
        if inner.workloads.contains_key(&key) {
            return Err(BackendError::api(
                "workload",
                &workload.name,
                "already exists",
            ));
        }

        // The backend owns status: a fresh workload converges immediately.
        inner.clock += 1;
        let mut stored = workload.clone();
        stored.status = WorkloadStatus {
            replicas: workload.replicas,
            ready_replicas: workload.replicas,
            available_replicas: workload.replicas,
            conditions: vec![WorkloadCondition {
                status: ConditionStatus::True,
                message: "workload has minimum availability".to_string(),
                last_transition: inner.clock,
            }],
        };

        inner.workloads.insert(key, stored);
        inner.ops.creates += 1;
        debug!(name = %workload.name, namespace = %workload.namespace, "workload created");
        Ok(())
    }

    async fn update_workload(&self, workload: &Workload) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (workload.namespace.clone(), workload.name.clone());
        let Some(existing) = inner.workloads.get(&key) else {
            return Err(BackendError::not_found("workload", &workload.name));
        };

        // Spec is replaced, status stays backend-owned.
        let mut stored = workload.clone();
        stored.status = existing.status.clone();
        inner.workloads.insert(key, stored);
        inner.ops.updates += 1;
        Ok(())
    }

    async fn list_workloads(&self, namespace: &str) -> BackendResult<Vec<Workload>> {
        let inner = self.inner.lock().unwrap();
        let mut workloads: Vec<Workload> = inner
            .workloads
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, w)| w.clone())
            .collect();
        workloads.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workloads)
    }

    // ── Cluster services ───────────────────────────────────────────

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> BackendResult<Option<ClusterService>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .services
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_service(&self, service: &ClusterService) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (service.namespace.clone(), service.name.clone());
        if inner.services.contains_key(&key) {
            return Err(BackendError::api(
                "service",
                &service.name,
                "already exists",
            ));
        }

        let mut stored = service.clone();
        if stored.kind == ServiceKind::NodePort {
            for port in &mut stored.ports {
                if port.node_port == 0 {
                    port.node_port = NODE_PORT_BASE + inner.next_node_port;
                    inner.next_node_port += 1;
                }
            }
        }

        inner.services.insert(key, stored);
        inner.ops.creates += 1;
        Ok(())
    }

    async fn update_service(&self, service: &ClusterService) -> BackendResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (service.namespace.clone(), service.name.clone());
        let Some(existing) = inner.services.get(&key).cloned() else {
            return Err(BackendError::not_found("service", &service.name));
        };

        // Allocated node ports are immutable: keep them for matching
        // port numbers, allocate for genuinely new ones.
        let mut stored = service.clone();
        if stored.kind == ServiceKind::NodePort {
            for port in &mut stored.ports {
                if port.node_port == 0 {
                    match existing.ports.iter().find(|p| p.port == port.port) {
                        Some(prev) if prev.node_port != 0 => port.node_port = prev.node_port,
                        _ => {
                            port.node_port = NODE_PORT_BASE + inner.next_node_port;
                            inner.next_node_port += 1;
                        }
                    }
                }
            }
        }

        inner.services.insert(key, stored);
        inner.ops.updates += 1;
        Ok(())
    }

    async fn list_services(&self, namespace: &str) -> BackendResult<Vec<ClusterService>> {
        let inner = self.inner.lock().unwrap();
        let mut services: Vec<ClusterService> = inner
            .services
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, s)| s.clone())
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    async fn list_nodes(&self) -> BackendResult<Vec<NodeInfo>> {
        Ok(self.inner.lock().unwrap().nodes.clone())
    }
}
