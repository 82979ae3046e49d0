//! Backend object naming and labels.

use sha2::{Digest, Sha256};

use caravel_core::DeploymentId;

/// Suffix appended to the node-port variant of a workload's service.
pub const NODE_PORT_SUFFIX: &str = "-np";

/// Label carrying the deployment ID on every owned object.
pub const LABEL_DEPLOYMENT_ID: &str = "caravel.dev/deployment-id";

/// Label carrying the tenant owner on the namespace.
pub const LABEL_OWNER: &str = "caravel.dev/owner";

/// Label carrying the workload name, used as the service selector.
pub const LABEL_WORKLOAD: &str = "caravel.dev/workload";

/// Derive the deterministic namespace for a deployment.
///
/// The ID is hashed so arbitrary tenant input becomes a valid DNS label;
/// the hex truncation keeps the name well under the 63-character limit
/// while leaving collisions out of practical reach.
pub fn deployment_namespace(id: &DeploymentId) -> String {
    let digest = Sha256::digest(id.as_bytes());
    format!("cv-{}", &hex::encode(digest)[..32])
}
