//! Domain types for deployments, services, and providers.
//!
//! These types travel across the manager ⇄ provider boundary and into the
//! state store, so everything is JSON-serializable. Backend-facing
//! representations (namespaces, workloads, cluster services) live in
//! `caravel-backend`; the compiled manifest lives in `caravel-manifest`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a deployment (assigned by the manager at creation).
pub type DeploymentId = String;

/// Unique identifier for a registered provider.
pub type ProviderId = String;

// ── Deployment ─────────────────────────────────────────────────────

/// Lifecycle state of a deployment.
///
/// `Close` is terminal: backend resources are torn down but the record is
/// retained for audit and listing by state filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Active,
    InActive,
    Close,
}

/// A tenant's declarative request for one or more running services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Deployment {
    pub id: DeploymentId,
    pub name: String,
    pub owner: String,
    pub state: DeploymentState,
    /// Opaque version blob, refreshed on every mutation. Used for
    /// optimistic change detection; callers must not interpret it.
    pub version: Vec<u8>,
    /// Provider this deployment is assigned to.
    pub provider_id: ProviderId,
    /// Externally reachable address of the provider, denormalized for
    /// display. Populated by the manager, not by compilation.
    pub expose_address: Option<String>,
    /// Ordered list of services. A deployment with zero services is
    /// invalid and is rejected before compilation.
    pub services: Vec<Service>,
    /// Unix timestamp (seconds) when this deployment was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last mutation.
    pub updated_at: u64,
}

impl Deployment {
    /// Minimal constructor used by callers that fill in identity later.
    pub fn new(owner: &str, name: &str, services: Vec<Service>) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            owner: owner.to_string(),
            state: DeploymentState::Active,
            version: Vec::new(),
            provider_id: String::new(),
            expose_address: None,
            services,
            created_at: 0,
            updated_at: 0,
        }
    }
}

// ── Service ────────────────────────────────────────────────────────

/// Live state of a service as derived from backend conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Normal,
    Error,
    #[default]
    Unknown,
}

/// Replica counts reported by the backend for one workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplicasStatus {
    pub total: u32,
    pub ready: u32,
    pub available: u32,
}

/// One container workload within a deployment.
///
/// Exclusively owned by its deployment; never shared between deployments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Service {
    /// Backend workload name. Empty until populated by read-back.
    pub name: String,
    /// Container image reference, e.g. `nginx:1.14.2`.
    pub image: String,
    /// Declared internal port. 0 means the service is not exposed.
    pub port: u16,
    /// Externally reachable port, populated only from backend read-back.
    pub expose_port: u16,
    /// Environment variables. Keys are unique; the map is unordered.
    pub env: HashMap<String, String>,
    /// Container arguments.
    pub arguments: Vec<String>,
    pub resources: ComputeResources,
    pub replicas: ReplicasStatus,
    pub state: ServiceState,
    /// Message from the most recent failing backend condition, if any.
    pub error_message: String,
}

// ── Compute resources ──────────────────────────────────────────────

/// One declared storage volume for a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageSpec {
    /// Capacity in megabyte-equivalent units.
    pub quantity_mb: i64,
    /// Persistent volumes survive workload replacement and force the
    /// workload onto the stateful path.
    pub persistent: bool,
    /// Storage class name; `None` selects the backend default.
    pub class: Option<String>,
}

impl StorageSpec {
    /// Ephemeral storage of the given size.
    pub fn ephemeral(quantity_mb: i64) -> Self {
        Self {
            quantity_mb,
            persistent: false,
            class: None,
        }
    }
}

/// Declared resource request for one service.
///
/// A zero value means the field was never set. `merge_from` relies on that
/// sentinel, so an explicit request for zero is not representable here;
/// `ServicePatch` is the unambiguous alternative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ComputeResources {
    /// CPU in fractional cores.
    pub cpu: f64,
    /// Memory in megabyte-equivalent units.
    pub memory_mb: i64,
    /// Declared storage volumes.
    pub storage: Vec<StorageSpec>,
}

impl ComputeResources {
    pub fn new(cpu: f64, memory_mb: i64, storage: Vec<StorageSpec>) -> Self {
        Self {
            cpu,
            memory_mb,
            storage,
        }
    }

    /// Whether this is the all-unset sentinel value.
    pub fn is_unset(&self) -> bool {
        self.cpu == 0.0 && self.memory_mb == 0 && self.storage.is_empty()
    }

    /// Copy set (non-zero) fields from `other`, keeping existing values
    /// for fields `other` leaves unset.
    pub fn merge_from(&mut self, other: &ComputeResources) {
        if other.cpu != 0.0 {
            self.cpu = other.cpu;
        }
        if other.memory_mb != 0 {
            self.memory_mb = other.memory_mb;
        }
        if !other.storage.is_empty() {
            self.storage = other.storage.clone();
        }
    }

    /// Whether any declared storage volume is persistent.
    pub fn has_persistent_storage(&self) -> bool {
        self.storage.iter().any(|s| s.persistent)
    }
}

// ── Provider ───────────────────────────────────────────────────────

/// Liveness state of a registered provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Online,
    Offline,
}

/// A registered remote execution backend.
///
/// Created on first successful connection handshake, updated on reconnect,
/// never hard-deleted — only marked offline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: ProviderId,
    pub owner: String,
    /// Externally reachable RPC address.
    pub host_uri: String,
    pub ip: String,
    pub state: ProviderState,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Statistics ─────────────────────────────────────────────────────

/// Capacity counters for one resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourcePoolStat {
    pub max: u64,
    pub available: u64,
    pub active: u64,
    pub pending: u64,
}

/// Cluster-wide resource statistics, summed over backend nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourcesStatistics {
    /// CPU in whole cores.
    pub cpu_cores: ResourcePoolStat,
    /// Memory in bytes.
    pub memory: ResourcePoolStat,
    /// Storage in bytes.
    pub storage: ResourcePoolStat,
}

// ── Filters ────────────────────────────────────────────────────────

/// Filter for deployment listing. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentFilter {
    pub owner: Option<String>,
    pub id: Option<DeploymentId>,
    pub states: Vec<DeploymentState>,
}

impl DeploymentFilter {
    /// Whether `deployment` passes this filter.
    pub fn matches(&self, deployment: &Deployment) -> bool {
        if let Some(owner) = &self.owner
            && &deployment.owner != owner
        {
            return false;
        }
        if let Some(id) = &self.id
            && &deployment.id != id
        {
            return false;
        }
        if !self.states.is_empty() && !self.states.contains(&deployment.state) {
            return false;
        }
        true
    }
}
