//! Shared runtime that owns every live resource instance.
//!
//! The runtime is the process-wide registry mapping cache keys to resource instances.
//! Instances are created on first use ([`ProviderRuntime::acquire`]) and torn down when
//! the last [`ResourceHandle`] for their key is dropped.

pub(crate) mod cache_mgmt;
pub(crate) mod instance;
pub(crate) mod request;
pub(crate) mod tasks;

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{
    auth::{AuthCheck, StoredCredentials},
    cache::ResourceCache,
    clock::{Clock, SystemClock},
    errors::{ProviderError, ProviderResult},
    handle::ResourceHandle,
    refresh::{RefreshRegistry, TaskType},
    resource::Resource,
    state::FetchOutcome,
    store::{KeyValueStore, MemoryStore},
};
use instance::{LiveEntry, ResourceInstance};

/// Lower bound on the polling period, whatever a resource asks for
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Window after a successful fetch during which unforced refreshes are skipped
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// Timing rules applied to every instance of a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub min_poll_interval: Duration,
    pub debounce: Duration,
}

impl SyncSettings {
    /// Polling period actually used for a requested interval
    pub fn effective_interval(&self, requested: Duration) -> Duration {
        requested.max(self.min_poll_interval)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            min_poll_interval: MIN_POLL_INTERVAL,
            debounce: DEBOUNCE_WINDOW,
        }
    }
}

/// Configuration for the provider runtime.
#[derive(Clone, Default)]
pub struct ProviderRuntimeConfig {
    store: Option<Arc<dyn KeyValueStore>>,
    auth: Option<Arc<dyn AuthCheck>>,
    clock: Option<Arc<dyn Clock>>,
    settings: SyncSettings,
}

impl ProviderRuntimeConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Durable store for cached values. Defaults to a [`MemoryStore`].
    pub fn with_store(mut self, store: impl Into<Arc<dyn KeyValueStore>>) -> Self {
        self.store = Some(store.into());
        self
    }

    /// Auth check for auth-dependent resources. Defaults to [`StoredCredentials`]
    /// reading the configured store.
    pub fn with_auth(mut self, auth: Arc<dyn AuthCheck>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Wall clock for envelope timestamps. Defaults to [`SystemClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Floor on every polling period. Defaults to [`MIN_POLL_INTERVAL`].
    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.min_poll_interval = interval;
        self
    }

    /// Window after a success in which unforced refreshes are skipped. Defaults to
    /// [`DEBOUNCE_WINDOW`].
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.settings.debounce = debounce;
        self
    }

    /// Timing rules the runtime will apply
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }
}

impl fmt::Debug for ProviderRuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRuntimeConfig")
            .field("custom_store", &self.store.is_some())
            .field("custom_auth", &self.auth.is_some())
            .field("custom_clock", &self.clock.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Central runtime that holds onto core singletons.
#[derive(Clone)]
pub struct ProviderRuntime {
    cache: ResourceCache,
    auth: Arc<dyn AuthCheck>,
    settings: SyncSettings,
    refresh_registry: RefreshRegistry,
    live: Arc<Mutex<HashMap<String, LiveEntry>>>,
    next_instance_id: Arc<AtomicU64>,
}

impl ProviderRuntime {
    /// Construct a new runtime instance using the provided configuration.
    pub fn new(config: ProviderRuntimeConfig) -> Self {
        let store = config
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let auth = config
            .auth
            .unwrap_or_else(|| Arc::new(StoredCredentials::new(store.clone())));
        let clock = config.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Self {
            cache: ResourceCache::new(store, clock),
            auth,
            settings: config.settings,
            refresh_registry: RefreshRegistry::new(),
            live: Arc::new(Mutex::new(HashMap::new())),
            next_instance_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Access the cache handle.
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Access the durable store behind the cache.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        self.cache.store()
    }

    /// Access the refresh registry handle.
    pub fn refresh_registry(&self) -> &RefreshRegistry {
        &self.refresh_registry
    }

    /// Timing rules applied to every instance.
    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    fn lock_live(&self) -> MutexGuard<'_, HashMap<String, LiveEntry>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts synchronizing `resource`, or joins the live instance for its cache key.
    ///
    /// On first use the persisted value is published and the auth check consulted before
    /// this returns; the first fetch then runs in the background, so a slow network never
    /// delays the cached value. When the key is already live, the existing instance
    /// (with the fetch and settings it was created with) is shared.
    ///
    /// ## Errors
    ///
    /// - [`ProviderError::Configuration`] if the cache key is empty
    /// - [`ProviderError::KeyConflict`] if the key is live with different value or error types
    pub async fn acquire<R: Resource>(
        &self,
        resource: R,
    ) -> ProviderResult<ResourceHandle<R::Output, R::Error>> {
        let key = resource.cache_key();
        if key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "cache key must not be empty".to_string(),
            ));
        }

        let created = {
            let mut live = self.lock_live();
            if let Some(entry) = live.get_mut(&key) {
                let shared = entry
                    .typed::<R::Output, R::Error>()
                    .ok_or_else(|| ProviderError::KeyConflict { key: key.clone() })?;
                entry.refs += 1;
                crate::debug_log!(
                    "🔗 [REGISTRY] Joined live instance for key: {} ({} handles)",
                    key,
                    entry.refs
                );
                return Ok(ResourceHandle::new(shared, self.clone()));
            }

            let id = self.next_instance_id.fetch_add(1, Ordering::Relaxed);
            let instance = Arc::new(ResourceInstance::new(
                id,
                resource,
                key.clone(),
                self.cache.clone(),
                self.auth.clone(),
                self.settings,
                self.refresh_registry.clone(),
            ));
            live.insert(key.clone(), LiveEntry::new(&instance));
            instance
        };

        crate::debug_log!("🆕 [REGISTRY] Created instance for key: {}", key);
        let handle = ResourceHandle::new(created.clone(), self.clone());
        activate(created).await;
        Ok(handle)
    }

    /// Runs a gated fetch for the live instance under `key`.
    ///
    /// Returns `None` if nothing is synchronizing that key.
    pub async fn refresh_key(&self, key: &str, force: bool) -> Option<FetchOutcome> {
        let erased = self.lock_live().get(key).map(|entry| entry.erased.clone())?;
        Some(erased.refresh(force).await)
    }

    /// Runs a gated fetch for every live instance, e.g. when the app returns to the foreground.
    pub async fn refresh_all(&self, force: bool) -> Vec<(String, FetchOutcome)> {
        let targets: Vec<_> = self
            .lock_live()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.erased.clone()))
            .collect();

        let refreshes = targets.into_iter().map(|(key, erased)| async move {
            let outcome = erased.refresh(force).await;
            (key, outcome)
        });
        futures::future::join_all(refreshes).await
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.lock_live().contains_key(key)
    }

    /// Number of live instances
    pub fn active_count(&self) -> usize {
        self.lock_live().len()
    }

    /// Number of handles currently holding `key`
    pub fn handle_count(&self, key: &str) -> usize {
        self.lock_live().get(key).map_or(0, |entry| entry.refs)
    }

    /// Adds a holder to instance `id` under `key`.
    ///
    /// A handle whose instance was already torn down (and possibly replaced under the
    /// same key) does not count towards the live entry.
    pub(crate) fn retain(&self, key: &str, id: u64) {
        if let Some(entry) = self.lock_live().get_mut(key)
            && entry.id == id
        {
            entry.refs += 1;
        }
    }

    /// Drops one holder of instance `id`; the last one tears the instance down.
    pub(crate) fn release(&self, key: &str, id: u64) {
        let removed = {
            let mut live = self.lock_live();
            let Some(entry) = live.get_mut(key) else {
                return;
            };
            if entry.id != id {
                return;
            }
            entry.refs = entry.refs.saturating_sub(1);
            if entry.refs > 0 {
                return;
            }
            live.remove(key)
        };

        if let Some(entry) = removed {
            entry.erased.shut_down();
            self.refresh_registry
                .stop_owned_task(key, TaskType::Polling, entry.id);
            crate::debug_log!("🗑️ [REGISTRY] Released instance for key: {}", key);
        }
    }

    /// Tears down every instance and stops all background tasks.
    ///
    /// Outstanding handles keep their last snapshot but no longer refresh.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.lock_live().drain().collect();
        for (_key, entry) in drained {
            entry.erased.shut_down();
        }
        self.refresh_registry.stop_all();
        crate::debug_log!("🛑 [REGISTRY] Runtime shut down");
    }
}

impl Default for ProviderRuntime {
    fn default() -> Self {
        Self::new(ProviderRuntimeConfig::default())
    }
}

/// Cache load, auth gate, then the first fetch and polling in the background.
///
/// Polling is armed even while no user is signed in.
async fn activate<R: Resource>(instance: Arc<ResourceInstance<R>>) {
    cache_mgmt::hydrate_from_cache(&instance).await;

    if instance.resource.auth_dependent() && !instance.auth.is_authenticated().await {
        instance.with_state(|s| s.settle_unauthenticated());
        instance.publish();
        crate::debug_log!(
            "🔒 [AUTH] No signed-in user, withholding fetch for key: {}",
            instance.key
        );
        // Each tick re-checks auth, so the first tick after a sign-in fetches.
        tasks::ensure_polling_task(&instance);
        return;
    }

    tokio::spawn(async move {
        request::refresh(&instance, false).await;
    });
}
