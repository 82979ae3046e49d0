//! The compiled workload group model.
//!
//! A `WorkloadGroup` is the backend-ready representation of one
//! deployment: an ordered list of named workloads, each carrying image,
//! command/args, env, resource units, and exposure declarations.

use serde::{Deserialize, Serialize};

use crate::units::ResourceUnits;

/// Transport protocol for an exposed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// One exposed port on a workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceExpose {
    /// Port the container listens on.
    pub port: u16,
    /// Port advertised outside the workload.
    pub external_port: u16,
    pub proto: Protocol,
    /// Globally reachable (externally routable) rather than
    /// cluster-local only.
    pub global: bool,
}

/// The compiled form of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Unique backend object name, also the correlation key when reading
    /// exposed ports back.
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    /// `KEY=VALUE` pairs. Order is unspecified — env is a mapping.
    pub env: Vec<String>,
    pub resources: ResourceUnits,
    pub expose: Vec<ServiceExpose>,
    pub replicas: u32,
}

impl Workload {
    /// Exposure records of the given visibility.
    pub fn expose_with_visibility(&self, global: bool) -> Vec<ServiceExpose> {
        self.expose
            .iter()
            .copied()
            .filter(|e| e.global == global)
            .collect()
    }
}

/// The full compiled set of workloads for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkloadGroup {
    pub workloads: Vec<Workload>,
}
