//! The provider engine — ties compile, apply, and read-back together
//! behind the `ProviderApi` surface.

use std::sync::Arc;

use async_trait::async_trait;
use semver::Version;
use tracing::{info, warn};
use uuid::Uuid;

use caravel_api::{ApiResult, ProviderApi, api_version};
use caravel_backend::BackendClient;
use caravel_core::{Deployment, DeploymentId, ResourcePoolStat, ResourcesStatistics};
use caravel_manifest::compile;

use crate::apply::{apply_group, delete_group};
use crate::error::ApplyResult;
use crate::readback::read_deployment;
use crate::settings::ProviderSettings;

/// Provider-side implementation of [`ProviderApi`] over one backend.
pub struct ProviderEngine {
    backend: Arc<dyn BackendClient>,
    settings: ProviderSettings,
    /// Stable for the lifetime of this engine; answers liveness probes.
    session: Uuid,
}

impl ProviderEngine {
    /// Create an engine. Settings are validated once here so every later
    /// apply starts from a usable policy.
    pub fn new(backend: Arc<dyn BackendClient>, settings: ProviderSettings) -> ApplyResult<Self> {
        settings.validate()?;
        Ok(Self {
            backend,
            settings,
            session: Uuid::new_v4(),
        })
    }

    /// Compile and apply in one step; shared by create and update, which
    /// are the same operation against an idempotent backend protocol.
    async fn deploy(&self, deployment: &Deployment) -> ApplyResult<()> {
        let group = compile(deployment)?;
        apply_group(self.backend.as_ref(), &self.settings, deployment, &group).await
    }
}

#[async_trait]
impl ProviderApi for ProviderEngine {
    async fn version(&self) -> ApiResult<Version> {
        Ok(api_version())
    }

    async fn session(&self) -> ApiResult<Uuid> {
        Ok(self.session)
    }

    async fn statistics(&self) -> ApiResult<ResourcesStatistics> {
        let nodes = self
            .backend
            .list_nodes()
            .await
            .map_err(crate::error::ApplyError::from)?;

        let mut stats = ResourcesStatistics::default();
        for node in nodes {
            if !node.ready {
                warn!(node = %node.name, "skipping node that is not ready");
                continue;
            }
            add_capacity(&mut stats.cpu_cores, node.capacity.cpu_milli / 1000);
            add_capacity(&mut stats.memory, node.capacity.memory_bytes);
            add_capacity(&mut stats.storage, node.capacity.storage_bytes);
            add_available(&mut stats.cpu_cores, node.allocatable.cpu_milli / 1000);
            add_available(&mut stats.memory, node.allocatable.memory_bytes);
            add_available(&mut stats.storage, node.allocatable.storage_bytes);
        }
        Ok(stats)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> ApiResult<()> {
        info!(deployment = %deployment.id, owner = %deployment.owner, "creating deployment");
        Ok(self.deploy(deployment).await?)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> ApiResult<()> {
        info!(deployment = %deployment.id, "updating deployment");
        Ok(self.deploy(deployment).await?)
    }

    async fn close_deployment(&self, deployment: &Deployment) -> ApiResult<()> {
        info!(deployment = %deployment.id, "closing deployment");
        delete_group(self.backend.as_ref(), &deployment.id).await?;
        Ok(())
    }

    async fn get_deployment(&self, id: &DeploymentId) -> ApiResult<Deployment> {
        Ok(read_deployment(self.backend.as_ref(), id).await?)
    }
}

fn add_capacity(stat: &mut ResourcePoolStat, amount: u64) {
    stat.max += amount;
}

fn add_available(stat: &mut ResourcePoolStat, amount: u64) {
    stat.available += amount;
}
