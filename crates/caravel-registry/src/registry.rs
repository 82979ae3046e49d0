//! The provider registry and its liveness sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use caravel_api::ProviderApi;
use caravel_core::ProviderId;

use crate::error::{RegistryError, RegistryResult};

/// Default interval between liveness sweep passes.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// A provider is evicted after this many heartbeat intervals without a
/// successful probe.
const TTL_INTERVALS: u32 = 3;

struct ProviderEntry {
    handle: Arc<dyn ProviderApi>,
    last_seen: Instant,
}

/// Concurrency-safe table of connected provider handles.
///
/// Constructed once per manager process; all mutability is confined
/// behind the internal lock. The lock is never held across a probe call.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<ProviderId, ProviderEntry>>,
    heartbeat_interval: Duration,
    provider_ttl: Duration,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            provider_ttl: DEFAULT_HEARTBEAT_INTERVAL * TTL_INTERVALS,
        }
    }

    /// Set the sweep interval; the TTL follows at three intervals.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.provider_ttl = interval * TTL_INTERVALS;
        self
    }

    /// Override the eviction TTL independently of the sweep interval.
    pub fn with_provider_ttl(mut self, ttl: Duration) -> Self {
        self.provider_ttl = ttl;
        self
    }

    /// Register a provider handle. Idempotent: the first registration
    /// wins and later ones for the same ID are ignored. Returns whether
    /// the handle was newly inserted.
    pub async fn add(&self, id: ProviderId, handle: Arc<dyn ProviderApi>) -> bool {
        let mut providers = self.providers.write().await;
        if providers.contains_key(&id) {
            debug!(provider = %id, "provider already registered");
            return false;
        }
        providers.insert(
            id.clone(),
            ProviderEntry {
                handle,
                last_seen: Instant::now(),
            },
        );
        info!(provider = %id, "provider registered");
        true
    }

    /// Get the live handle for a provider.
    ///
    /// A provider whose last successful probe is older than the TTL is
    /// unavailable even before the sweep evicts it.
    pub async fn get(&self, id: &ProviderId) -> RegistryResult<Arc<dyn ProviderApi>> {
        let providers = self.providers.read().await;
        match providers.get(id) {
            Some(entry) if entry.last_seen.elapsed() <= self.provider_ttl => {
                Ok(Arc::clone(&entry.handle))
            }
            Some(_) => Err(RegistryError::ProviderUnavailable(id.clone())),
            None => Err(RegistryError::ProviderUnavailable(id.clone())),
        }
    }

    /// Remove a provider outright, e.g. on explicit disconnect.
    /// Returns whether it was present.
    pub async fn remove(&self, id: &ProviderId) -> bool {
        let removed = self.providers.write().await.remove(id).is_some();
        if removed {
            info!(provider = %id, "provider removed");
        }
        removed
    }

    /// Number of registered providers, including not-yet-evicted ones.
    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }

    /// One sweep pass: probe every provider, refresh `last_seen` on
    /// success, evict providers that have been silent past the TTL.
    /// Returns the evicted provider IDs.
    ///
    /// The snapshot/probe/update split keeps the lock out of the probe
    /// path; each probe is bounded to half the heartbeat interval.
    pub async fn sweep_once(&self) -> Vec<ProviderId> {
        let snapshot: Vec<(ProviderId, Arc<dyn ProviderApi>)> = {
            let providers = self.providers.read().await;
            providers
                .iter()
                .map(|(id, entry)| (id.clone(), Arc::clone(&entry.handle)))
                .collect()
        };

        let probe_timeout = self.heartbeat_interval / 2;
        let mut results = Vec::with_capacity(snapshot.len());
        for (id, handle) in snapshot {
            let alive = match tokio::time::timeout(probe_timeout, handle.session()).await {
                Ok(Ok(_)) => true,
                Ok(Err(e)) => {
                    warn!(provider = %id, error = %e, "session probe failed");
                    false
                }
                Err(_) => {
                    warn!(provider = %id, timeout = ?probe_timeout, "session probe timed out");
                    false
                }
            };
            results.push((id, alive));
        }

        let mut evicted = Vec::new();
        let mut providers = self.providers.write().await;
        for (id, alive) in results {
            let Some(entry) = providers.get_mut(&id) else {
                continue;
            };
            if alive {
                entry.last_seen = Instant::now();
            } else if entry.last_seen.elapsed() > self.provider_ttl {
                warn!(provider = %id, "provider evicted after missing TTL");
                providers.remove(&id);
                evicted.push(id);
            }
            // A failed probe within the TTL is tolerated — likely a
            // temporary error.
        }
        evicted
    }

    /// Run the liveness sweep until the shutdown channel fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.heartbeat_interval);
        // The first tick fires immediately; skip it so freshly added
        // providers get a full interval before their first probe.
        ticker.tick().await;

        info!(interval = ?self.heartbeat_interval, ttl = ?self.provider_ttl, "liveness sweep started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep_once().await;
                    if !evicted.is_empty() {
                        info!(count = evicted.len(), "providers evicted");
                    }
                }
                _ = shutdown.changed() => {
                    info!("liveness sweep shutting down");
                    break;
                }
            }
        }
    }
}
