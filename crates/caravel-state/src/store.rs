//! StateStore — typed CRUD over deployments, services, and providers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use caravel_core::{
    Deployment, DeploymentFilter, DeploymentId, DeploymentState, Provider, ProviderId, Service,
    epoch_secs,
};

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing and
    /// standalone mode).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        txn.open_table(SERVICES).map_err(map_err!(Table))?;
        txn.open_table(PROVIDERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Deployments ────────────────────────────────────────────────

    /// Insert or update a deployment and replace its service rows, all
    /// in one transaction.
    pub fn put_deployment(&self, deployment: &Deployment) -> StateResult<()> {
        let mut row = deployment.clone();
        let services = std::mem::take(&mut row.services);
        let row_value = serde_json::to_vec(&row).map_err(map_err!(Encode))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut deployments = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            deployments
                .insert(deployment.id.as_str(), row_value.as_slice())
                .map_err(map_err!(Write))?;

            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            let stale: Vec<String> = collect_service_keys(&table, &deployment.id)?;
            for key in &stale {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
            }
            for (index, service) in services.iter().enumerate() {
                let key = service_key(&deployment.id, index);
                let value = serde_json::to_vec(service).map_err(map_err!(Encode))?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(deployment = %deployment.id, services = deployment.services.len(), "deployment stored");
        Ok(())
    }

    /// Get a deployment with its services reassembled.
    pub fn get_deployment(&self, id: &DeploymentId) -> StateResult<Option<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let deployments = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;

        let Some(guard) = deployments.get(id.as_str()).map_err(map_err!(Read))? else {
            return Ok(None);
        };
        let mut deployment: Deployment =
            serde_json::from_slice(guard.value()).map_err(map_err!(Decode))?;

        let services = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        deployment.services = read_services(&services, id)?;
        Ok(Some(deployment))
    }

    /// List deployments matching the filter, services included.
    pub fn list_deployments(&self, filter: &DeploymentFilter) -> StateResult<Vec<Deployment>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let deployments = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
        let services = txn.open_table(SERVICES).map_err(map_err!(Table))?;

        // One pass over the service table; keys sort by deployment and
        // declaration index.
        let mut by_deployment: HashMap<String, Vec<Service>> = HashMap::new();
        for entry in services.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let Some((deployment_id, _)) = key.value().rsplit_once(':') else {
                continue;
            };
            let service: Service =
                serde_json::from_slice(value.value()).map_err(map_err!(Decode))?;
            by_deployment
                .entry(deployment_id.to_string())
                .or_default()
                .push(service);
        }

        let mut results = Vec::new();
        for entry in deployments.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let mut deployment: Deployment =
                serde_json::from_slice(value.value()).map_err(map_err!(Decode))?;
            deployment.services = by_deployment.remove(&deployment.id).unwrap_or_default();
            if filter.matches(&deployment) {
                results.push(deployment);
            }
        }
        Ok(results)
    }

    /// Transition a deployment's state in place, refreshing `updated_at`.
    pub fn update_deployment_state(
        &self,
        id: &DeploymentId,
        state: DeploymentState,
    ) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut deployments = txn.open_table(DEPLOYMENTS).map_err(map_err!(Table))?;
            let mut deployment: Deployment = match deployments
                .get(id.as_str())
                .map_err(map_err!(Read))?
            {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Decode))?
                }
                None => return Err(StateError::NotFound(format!("deployment {id}"))),
            };

            deployment.state = state;
            deployment.updated_at = epoch_secs();
            let value = serde_json::to_vec(&deployment).map_err(map_err!(Encode))?;
            deployments
                .insert(id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(deployment = %id, ?state, "deployment state updated");
        Ok(())
    }

    // ── Providers ──────────────────────────────────────────────────

    /// Insert or update a provider row.
    pub fn put_provider(&self, provider: &Provider) -> StateResult<()> {
        let value = serde_json::to_vec(provider).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut providers = txn.open_table(PROVIDERS).map_err(map_err!(Table))?;
            providers
                .insert(provider.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(provider = %provider.id, "provider stored");
        Ok(())
    }

    /// Get a provider by ID.
    pub fn get_provider(&self, id: &ProviderId) -> StateResult<Option<Provider>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let providers = txn.open_table(PROVIDERS).map_err(map_err!(Table))?;
        match providers.get(id.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let provider: Provider =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Decode))?;
                Ok(Some(provider))
            }
            None => Ok(None),
        }
    }

    /// List all providers.
    pub fn list_providers(&self) -> StateResult<Vec<Provider>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let providers = txn.open_table(PROVIDERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in providers.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let provider: Provider =
                serde_json::from_slice(value.value()).map_err(map_err!(Decode))?;
            results.push(provider);
        }
        Ok(results)
    }
}

fn service_key(deployment_id: &str, index: usize) -> String {
    format!("{deployment_id}:{index:04}")
}

fn collect_service_keys<T: ReadableTable<&'static str, &'static [u8]>>(
    table: &T,
    deployment_id: &str,
) -> StateResult<Vec<String>> {
    let prefix = format!("{deployment_id}:");
    let mut keys = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, _) = entry.map_err(map_err!(Read))?;
        if key.value().starts_with(&prefix) {
            keys.push(key.value().to_string());
        }
    }
    Ok(keys)
}

fn read_services<T: ReadableTable<&'static str, &'static [u8]>>(
    table: &T,
    deployment_id: &str,
) -> StateResult<Vec<Service>> {
    let prefix = format!("{deployment_id}:");
    let mut services = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (key, value) = entry.map_err(map_err!(Read))?;
        if key.value().starts_with(&prefix) {
            let service: Service =
                serde_json::from_slice(value.value()).map_err(map_err!(Decode))?;
            services.push(service);
        }
    }
    Ok(services)
}
