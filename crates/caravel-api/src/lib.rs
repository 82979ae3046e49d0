//! caravel-api — the manager ⇄ provider RPC boundary.
//!
//! The manager never sees a concrete provider implementation; it holds
//! [`ProviderApi`] trait objects. The in-process engine
//! (`caravel-provider`) implements the trait directly; a remote transport
//! plugs in behind the same surface. The `session`/`version` pair doubles
//! as the liveness probe and the connect-time handshake.

pub mod error;

pub use error::{ApiError, ApiResult};

use async_trait::async_trait;
use semver::Version;
use uuid::Uuid;

use caravel_core::{Deployment, DeploymentId, ResourcesStatistics};

/// Version of the provider API surface.
pub fn api_version() -> Version {
    Version::new(0, 1, 0)
}

/// Compatibility is checked on major.minor only; patch revisions of the
/// same surface interoperate.
pub fn versions_compatible(a: &Version, b: &Version) -> bool {
    a.major == b.major && a.minor == b.minor
}

/// Operations a provider exposes to the manager.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// API version of this provider, checked at connect time.
    async fn version(&self) -> ApiResult<Version>;

    /// Lightweight session probe. Returns a token stable for the lifetime
    /// of the provider process; used by the liveness sweep.
    async fn session(&self) -> ApiResult<Uuid>;

    /// Aggregate resource statistics over the provider's cluster nodes.
    async fn statistics(&self) -> ApiResult<ResourcesStatistics>;

    /// Compile and apply a deployment's resources to the cluster.
    async fn create_deployment(&self, deployment: &Deployment) -> ApiResult<()>;

    /// Re-compile and re-apply; idempotent by construction.
    async fn update_deployment(&self, deployment: &Deployment) -> ApiResult<()>;

    /// Tear down the deployment's namespace and everything in it.
    async fn close_deployment(&self, deployment: &Deployment) -> ApiResult<()>;

    /// Reconstruct the deployment's live service status from the cluster.
    async fn get_deployment(&self, id: &DeploymentId) -> ApiResult<Deployment>;
}

impl std::fmt::Debug for dyn ProviderApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn ProviderApi")
    }
}
