//! Lifecycle orchestration over the registry, provider API, and store.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use caravel_api::{ProviderApi, api_version, versions_compatible};
use caravel_core::{
    Deployment, DeploymentFilter, DeploymentId, DeploymentState, Provider, ProviderState,
    ResourcesStatistics, epoch_secs,
};
use caravel_registry::ProviderRegistry;
use caravel_state::StateStore;

use crate::error::{ManagerError, ManagerResult};

/// The manager-side state machine: plain constructor, explicit
/// dependencies, no ambient wiring.
pub struct Manager {
    store: StateStore,
    registry: Arc<ProviderRegistry>,
}

impl Manager {
    pub fn new(store: StateStore, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    // ── Providers ──────────────────────────────────────────────────

    /// Handle a provider connection handshake: check API compatibility,
    /// register the live handle, and upsert the provider row as online.
    pub async fn provider_connect(
        &self,
        mut provider: Provider,
        handle: Arc<dyn ProviderApi>,
    ) -> ManagerResult<()> {
        let remote = handle.version().await?;
        let local = api_version();
        if !versions_compatible(&remote, &local) {
            return Err(ManagerError::IncompatibleVersion {
                remote: remote.to_string(),
                local: local.to_string(),
            });
        }

        self.registry.add(provider.id.clone(), handle).await;

        let now = epoch_secs();
        provider.created_at = match self.store.get_provider(&provider.id)? {
            // Reconnect: keep the original registration time.
            Some(existing) => existing.created_at,
            None => now,
        };
        provider.updated_at = now;
        provider.state = ProviderState::Online;

        info!(provider = %provider.id, host = %provider.host_uri, "provider connected");
        self.store.put_provider(&provider)?;
        Ok(())
    }

    /// All known providers, online or offline.
    pub fn list_providers(&self) -> ManagerResult<Vec<Provider>> {
        Ok(self.store.list_providers()?)
    }

    /// Resource statistics from one provider's cluster.
    pub async fn provider_statistics(
        &self,
        id: &caravel_core::ProviderId,
    ) -> ManagerResult<ResourcesStatistics> {
        let handle = self.registry.get(id).await?;
        Ok(handle.statistics().await?)
    }

    // ── Deployment lifecycle ───────────────────────────────────────

    /// Create a deployment: resolve the provider, assign identity, apply
    /// remotely, then persist. A remote failure leaves no orphan record.
    pub async fn create_deployment(
        &self,
        mut deployment: Deployment,
    ) -> ManagerResult<Deployment> {
        let provider = self.registry.get(&deployment.provider_id).await?;

        let now = epoch_secs();
        deployment.id = Uuid::new_v4().simple().to_string();
        deployment.state = DeploymentState::Active;
        deployment.version = fresh_version();
        deployment.created_at = now;
        deployment.updated_at = now;
        // Denormalized for display: the provider's reachable address.
        deployment.expose_address = self
            .store
            .get_provider(&deployment.provider_id)?
            .map(|p| p.host_uri);

        provider.create_deployment(&deployment).await?;

        if let Err(e) = self.store.put_deployment(&deployment) {
            // The apply already succeeded; the backend resources are
            // orphaned until a later close or manual intervention.
            error!(
                deployment = %deployment.id,
                error = %e,
                "persisting deployment after successful apply failed — backend resources orphaned"
            );
            return Err(e.into());
        }

        info!(deployment = %deployment.id, owner = %deployment.owner, "deployment created");
        Ok(deployment)
    }

    /// Update a deployment in place. Reuses the idempotent apply path;
    /// there is no distinct updating state.
    pub async fn update_deployment(
        &self,
        mut deployment: Deployment,
    ) -> ManagerResult<Deployment> {
        let stored = self
            .store
            .get_deployment(&deployment.id)?
            .ok_or_else(|| ManagerError::NotFound(deployment.id.clone()))?;
        if stored.state == DeploymentState::Close {
            return Err(ManagerError::DeploymentClosed(deployment.id));
        }

        // Identity and placement are fixed at creation.
        deployment.owner = stored.owner;
        deployment.provider_id = stored.provider_id;
        deployment.created_at = stored.created_at;
        deployment.expose_address = stored.expose_address;
        deployment.state = DeploymentState::Active;
        deployment.version = fresh_version();
        deployment.updated_at = epoch_secs();

        let provider = self.registry.get(&deployment.provider_id).await?;
        provider.update_deployment(&deployment).await?;

        if let Err(e) = self.store.put_deployment(&deployment) {
            error!(
                deployment = %deployment.id,
                error = %e,
                "persisting deployment after successful apply failed — backend resources orphaned"
            );
            return Err(e.into());
        }

        info!(deployment = %deployment.id, "deployment updated");
        Ok(deployment)
    }

    /// Close a deployment: tear down backend resources, then transition
    /// the row to its terminal state. The row itself is retained.
    pub async fn close_deployment(&self, id: &DeploymentId) -> ManagerResult<()> {
        let stored = self
            .store
            .get_deployment(id)?
            .ok_or_else(|| ManagerError::NotFound(id.clone()))?;
        if stored.state == DeploymentState::Close {
            warn!(deployment = %id, "deployment already closed");
            return Ok(());
        }

        let provider = self.registry.get(&stored.provider_id).await?;
        // Deletion is not retried here; the error goes back to the caller
        // and the row stays in its previous state.
        provider.close_deployment(&stored).await?;

        self.store.update_deployment_state(id, DeploymentState::Close)?;
        info!(deployment = %id, "deployment closed");
        Ok(())
    }

    /// Live status of a deployment, read back from its provider's
    /// backend. Does not touch the stored row.
    pub async fn deployment_status(&self, id: &DeploymentId) -> ManagerResult<Deployment> {
        let stored = self
            .store
            .get_deployment(id)?
            .ok_or_else(|| ManagerError::NotFound(id.clone()))?;
        let provider = self.registry.get(&stored.provider_id).await?;

        let mut live = provider.get_deployment(id).await?;
        live.name = stored.name;
        live.provider_id = stored.provider_id;
        live.expose_address = stored.expose_address;
        Ok(live)
    }

    /// Pure read of one deployment row.
    pub fn get_deployment(&self, id: &DeploymentId) -> ManagerResult<Deployment> {
        self.store
            .get_deployment(id)?
            .ok_or_else(|| ManagerError::NotFound(id.clone()))
    }

    /// Pure filtered read over deployment rows.
    pub fn list_deployments(&self, filter: &DeploymentFilter) -> ManagerResult<Vec<Deployment>> {
        Ok(self.store.list_deployments(filter)?)
    }
}

/// Opaque change-detection blob: fresh randomness per mutation.
fn fresh_version() -> Vec<u8> {
    Uuid::new_v4().into_bytes().to_vec()
}
