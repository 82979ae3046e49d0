//! Resource quantity arithmetic.
//!
//! Declared resources arrive as fractional cores and megabyte units; the
//! backend wants whole milli-cores and bytes, each as a requested/limit
//! pair. The limit is always the full declared quantity. The request may
//! be shrunk by an overcommit factor, which lets an operator pack more
//! workloads onto a node than their peak declared limits.

use serde::{Deserialize, Serialize};

use caravel_core::{ComputeResources, StorageSpec};

/// Megabyte-equivalent unit to bytes.
const BYTES_PER_MB: i64 = 1_000_000;

/// A requested/limit pair for one resource quantity.
///
/// Invariant: `requested <= limit`. A freshly derived pair has
/// `requested == limit`; only [`ResourcePair::commit`] shrinks the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourcePair {
    pub requested: u64,
    pub limit: u64,
}

impl ResourcePair {
    /// A pair with the request equal to the limit.
    pub fn new(limit: u64) -> Self {
        Self {
            requested: limit,
            limit,
        }
    }

    /// Apply a commit-level factor, deriving the request from the limit.
    ///
    /// A factor at or below 1.0 leaves the request at the limit — there is
    /// no concept of undercommit. Above 1.0 the request becomes
    /// `round(limit / factor)`, floored at 1 because a request of zero is
    /// invalid for the backend.
    pub fn commit(self, factor: f64) -> Self {
        if factor <= 1.0 {
            return Self::new(self.limit);
        }

        let committed = (self.limit as f64 / factor).round() as u64;
        Self {
            requested: committed.max(1),
            limit: self.limit,
        }
    }
}

/// One storage quantity with its scheduling attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUnits {
    pub quantity: ResourcePair,
    pub persistent: bool,
    /// Storage class name; `None` selects the backend default.
    pub class: Option<String>,
}

/// Backend-facing resource quantities for one workload.
///
/// CPU is in whole milli-cores, memory and storage in whole bytes.
/// Derived from [`ComputeResources`], never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceUnits {
    pub cpu_milli: ResourcePair,
    pub memory_bytes: ResourcePair,
    pub storage: Vec<StorageUnits>,
}

impl ResourceUnits {
    /// Derive backend units from declared resources.
    ///
    /// CPU: `round(cores * 1000)` milli-cores. Memory and storage:
    /// `mb * 1_000_000` bytes. All requests start equal to their limits.
    pub fn from_compute(resources: &ComputeResources) -> Self {
        Self {
            cpu_milli: ResourcePair::new((resources.cpu * 1000.0).round() as u64),
            memory_bytes: ResourcePair::new((resources.memory_mb * BYTES_PER_MB) as u64),
            storage: resources.storage.iter().map(storage_units).collect(),
        }
    }

    /// Apply per-class commit levels, shrinking requests only.
    ///
    /// Requests always derive from limits, so committing is idempotent:
    /// applying the same levels twice yields the same result as once.
    pub fn commit(&self, levels: &CommitLevels) -> Self {
        Self {
            cpu_milli: self.cpu_milli.commit(levels.cpu),
            memory_bytes: self.memory_bytes.commit(levels.memory),
            storage: self
                .storage
                .iter()
                .map(|s| StorageUnits {
                    quantity: s.quantity.commit(levels.storage),
                    persistent: s.persistent,
                    class: s.class.clone(),
                })
                .collect(),
        }
    }

    /// Whether any storage quantity carries the persistent attribute.
    pub fn has_persistent_storage(&self) -> bool {
        self.storage.iter().any(|s| s.persistent)
    }
}

fn storage_units(spec: &StorageSpec) -> StorageUnits {
    StorageUnits {
        quantity: ResourcePair::new((spec.quantity_mb * BYTES_PER_MB) as u64),
        persistent: spec.persistent,
        class: spec.class.clone(),
    }
}

/// Per-class overcommit factors.
///
/// A factor of 1.0 advertises requests equal to limits; 2.0 advertises
/// half the limit as the scheduling request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommitLevels {
    pub cpu: f64,
    pub memory: f64,
    pub storage: f64,
}

impl Default for CommitLevels {
    fn default() -> Self {
        Self {
            cpu: 1.0,
            memory: 1.0,
            storage: 1.0,
        }
    }
}

impl CommitLevels {
    /// All factors must be positive; zero or negative factors are
    /// meaningless and rejected before any apply.
    pub fn is_valid(&self) -> bool {
        self.cpu > 0.0 && self.memory > 0.0 && self.storage > 0.0
    }
}
