//! One live resource instance and the type-erased views the registry keeps of it.

use std::{
    any::Any,
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::{
    auth::AuthCheck,
    cache::{CachePolicy, ResourceCache},
    provider_state::ProviderState,
    refresh::RefreshRegistry,
    resource::Resource,
    runtime::{SyncSettings, request},
    state::{FetchOutcome, Snapshot},
};

pub(crate) struct ResourceInstance<R: Resource> {
    /// Unique per runtime; distinguishes successive instances under one key
    pub id: u64,
    pub resource: R,
    pub key: String,
    pub policy: CachePolicy,
    pub cache: ResourceCache,
    pub auth: Arc<dyn AuthCheck>,
    pub settings: SyncSettings,
    pub registry: RefreshRegistry,
    state: Mutex<ProviderState<R::Output, R::Error>>,
    publisher: watch::Sender<Snapshot<R::Output, R::Error>>,
}

impl<R: Resource> ResourceInstance<R> {
    pub fn new(
        id: u64,
        resource: R,
        key: String,
        cache: ResourceCache,
        auth: Arc<dyn AuthCheck>,
        settings: SyncSettings,
        registry: RefreshRegistry,
    ) -> Self {
        let initial = resource.initial_value();
        let policy = resource.cache_policy();
        let (publisher, _) = watch::channel(Snapshot::seeded(initial.clone()));
        let mut state = ProviderState::new(initial);
        state.set_authenticated(!resource.auth_dependent());
        Self {
            id,
            resource,
            key,
            policy,
            cache,
            auth,
            settings,
            registry,
            state: Mutex::new(state),
            publisher,
        }
    }

    pub fn with_state<O>(
        &self,
        op: impl FnOnce(&mut ProviderState<R::Output, R::Error>) -> O,
    ) -> O {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut state)
    }

    pub fn is_torn_down(&self) -> bool {
        self.with_state(|s| s.is_torn_down())
    }

    /// Pushes the current state to subscribers; a torn-down instance stays silent
    pub fn publish(&self) {
        let snapshot = self.with_state(|s| (!s.is_torn_down()).then(|| s.snapshot()));
        if let Some(snapshot) = snapshot {
            self.publisher.send_replace(snapshot);
        }
    }

    /// Identity the cache envelope is bound to, if the policy binds one
    pub async fn owner_identity(&self) -> Option<String> {
        if self.policy.binds_identity() {
            self.auth.identity().await
        } else {
            None
        }
    }
}

/// Typed view shared by every handle on the same cache key
pub(crate) trait SharedInstance<T, E>: Send + Sync {
    fn id(&self) -> u64;
    fn key(&self) -> &str;
    fn snapshot(&self) -> Snapshot<T, E>;
    fn subscribe(&self) -> watch::Receiver<Snapshot<T, E>>;
    fn last_failure(&self) -> Option<E>;
    fn is_authenticated(&self) -> bool;
    fn has_fetched(&self) -> bool;
    fn refresh(self: Arc<Self>, force: bool) -> BoxFuture<'static, FetchOutcome>;
}

impl<R: Resource> SharedInstance<R::Output, R::Error> for ResourceInstance<R> {
    fn id(&self) -> u64 {
        self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn snapshot(&self) -> Snapshot<R::Output, R::Error> {
        self.with_state(|s| s.snapshot())
    }

    fn subscribe(&self) -> watch::Receiver<Snapshot<R::Output, R::Error>> {
        self.publisher.subscribe()
    }

    fn last_failure(&self) -> Option<R::Error> {
        self.with_state(|s| s.last_failure().cloned())
    }

    fn is_authenticated(&self) -> bool {
        self.with_state(|s| s.is_authenticated())
    }

    fn has_fetched(&self) -> bool {
        self.with_state(|s| s.has_fetched())
    }

    fn refresh(self: Arc<Self>, force: bool) -> BoxFuture<'static, FetchOutcome> {
        Box::pin(async move { request::refresh(&self, force).await })
    }
}

/// Untyped view used by the registry for keyed refresh and teardown
pub(crate) trait ErasedInstance: Send + Sync {
    fn refresh(self: Arc<Self>, force: bool) -> BoxFuture<'static, FetchOutcome>;
    fn shut_down(&self);
}

impl<R: Resource> ErasedInstance for ResourceInstance<R> {
    fn refresh(self: Arc<Self>, force: bool) -> BoxFuture<'static, FetchOutcome> {
        Box::pin(async move { request::refresh(&self, force).await })
    }

    fn shut_down(&self) {
        self.with_state(|s| s.tear_down());
    }
}

/// Registry slot for one cache key
pub(crate) struct LiveEntry {
    pub id: u64,
    pub erased: Arc<dyn ErasedInstance>,
    /// `Arc<dyn SharedInstance<T, E>>` boxed as `Any` for typed lookups
    pub typed: Arc<dyn Any + Send + Sync>,
    pub refs: usize,
}

impl LiveEntry {
    pub fn new<R: Resource>(instance: &Arc<ResourceInstance<R>>) -> Self {
        let typed: Arc<dyn SharedInstance<R::Output, R::Error>> = instance.clone();
        Self {
            id: instance.id,
            erased: instance.clone(),
            typed: Arc::new(typed),
            refs: 1,
        }
    }

    pub fn typed<T: 'static, E: 'static>(&self) -> Option<Arc<dyn SharedInstance<T, E>>> {
        self.typed
            .downcast_ref::<Arc<dyn SharedInstance<T, E>>>()
            .cloned()
    }
}
