//! Declarative backend resource descriptions.
//!
//! These mirror the shape of a Kubernetes-compatible API closely enough
//! for the apply engine to upsert against, without binding to a concrete
//! client library. Status sub-objects are written by the backend and only
//! read here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Namespace ──────────────────────────────────────────────────────

/// Per-deployment isolation scope. All other resources are namespaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub labels: HashMap<String, String>,
}

// ── Network policy ─────────────────────────────────────────────────

/// One ingress rule within a network policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    /// Allow traffic from pods in the same namespace.
    pub allow_same_namespace: bool,
    /// Allow external traffic to these ports. Empty with
    /// `allow_same_namespace == false` denies all ingress.
    pub ports: Vec<u16>,
}

/// Namespaced traffic isolation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    pub name: String,
    pub namespace: String,
    pub labels: HashMap<String, String>,
    pub ingress: Vec<IngressRule>,
}

// ── Workload ───────────────────────────────────────────────────────

/// Resource quantities for one container, by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceList {
    pub cpu_milli: u64,
    pub memory_bytes: u64,
    pub storage_bytes: u64,
}

/// Scheduling requests and enforcement limits for one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceRequirements {
    pub requests: ResourceList,
    pub limits: ResourceList,
}

/// One environment variable on a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// One exposed container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPort {
    pub container_port: u16,
}

/// One container within a workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: Vec<EnvVar>,
    pub ports: Vec<ContainerPort>,
    pub resources: ResourceRequirements,
}

/// A durable volume claim attached to a stateful workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeClaim {
    pub name: String,
    pub quantity_bytes: u64,
    /// Storage class name; `None` selects the backend default.
    pub class: Option<String>,
}

/// Workload kind, decided once at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Freely replaceable replicas with no stable identity.
    Replicated,
    /// Stable identity backed by durable volumes.
    Stateful { volume_claims: Vec<VolumeClaim> },
}

/// Truth value of a workload condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// One condition in a workload's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadCondition {
    pub status: ConditionStatus,
    pub message: String,
    /// Unix timestamp (seconds) of the last transition.
    pub last_transition: u64,
}

/// Status written by the backend as a workload converges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkloadStatus {
    pub replicas: u32,
    pub ready_replicas: u32,
    pub available_replicas: u32,
    pub conditions: Vec<WorkloadCondition>,
}

/// A container workload — replicated or stateful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub namespace: String,
    pub kind: WorkloadKind,
    pub labels: HashMap<String, String>,
    pub replicas: u32,
    pub containers: Vec<ContainerSpec>,
    /// Reference to image-pull credentials, when configured.
    pub image_pull_secret: Option<String>,
    pub status: WorkloadStatus,
}

// ── Cluster service ────────────────────────────────────────────────

/// Exposure scope of a cluster service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Reachable only inside the cluster.
    ClusterIp,
    /// Externally routable via a backend-allocated node port.
    NodePort,
}

/// One port mapping on a cluster service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub port: u16,
    pub target_port: u16,
    /// Allocated by the backend for node-port services; 0 until assigned.
    pub node_port: u16,
}

/// Service object exposing one workload's ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterService {
    pub name: String,
    pub namespace: String,
    pub kind: ServiceKind,
    /// Label selector matching the target workload.
    pub selector: HashMap<String, String>,
    pub ports: Vec<ServicePort>,
}

// ── Node ───────────────────────────────────────────────────────────

/// Capacity feed for one backend node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub ready: bool,
    /// Total installed capacity.
    pub capacity: ResourceList,
    /// Capacity still schedulable.
    pub allocatable: ResourceList,
}
