//! # Resources
//!
//! A resource is one named piece of remote data kept fresh by the runtime: a cache key,
//! a fetch operation, a refresh interval, an optional seed value and an auth flag.
//!
//! Implement [`Resource`] on your own type, or build one from a closure with
//! [`ResourceDescriptor`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use resource_sync::prelude::*;
//!
//! # async fn demo(runtime: ProviderRuntime) -> Result<(), ProviderError> {
//! let stats = ResourceDescriptor::new("request-stats", || async {
//!     Ok::<_, ProviderError>(vec![3u32, 1, 4])
//! })
//! .refresh_interval(Duration::from_secs(120))
//! .auth_dependent(false);
//!
//! let handle = runtime.acquire(stats).await?;
//! println!("{:?}", handle.snapshot().data);
//! # Ok(())
//! # }
//! ```

use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};

use crate::{
    cache::CachePolicy,
    types::{ResourceErrorBounds, ResourceValueBounds},
};

/// Refresh interval used when a resource does not choose one
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// A remote resource the runtime keeps synchronized
///
/// ## Features
///
/// - **Cache-first**: the last persisted value is published before any network call
/// - **Auth gating**: auth-dependent resources wait for a signed-in user
/// - **Single-flight**: at most one fetch per resource instance is ever outstanding
/// - **Polling**: background refresh at `max(refresh_interval, 60s)`
pub trait Resource: Send + Sync + 'static {
    /// The type of data returned on success
    type Output: ResourceValueBounds;
    /// The type of error returned on failure
    type Error: ResourceErrorBounds;

    /// Slot in the durable store. Must be non-empty and unique across the application.
    fn cache_key(&self) -> String;

    /// Execute one independent attempt at loading the value
    fn fetch(&self) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;

    /// Desired period between background refreshes; the runtime enforces a floor
    fn refresh_interval(&self) -> Duration {
        DEFAULT_REFRESH_INTERVAL
    }

    /// Value published before the cache or the network produced anything
    fn initial_value(&self) -> Option<Self::Output> {
        None
    }

    /// Whether fetching must wait for the auth check to report a signed-in user
    fn auth_dependent(&self) -> bool {
        true
    }

    /// How the value is wrapped in the durable store
    fn cache_policy(&self) -> CachePolicy {
        CachePolicy::Plain
    }
}

/// A [`Resource`] assembled from a cache key and a fetch closure
pub struct ResourceDescriptor<T, E, F> {
    cache_key: String,
    fetch: Arc<F>,
    refresh_interval: Duration,
    initial_value: Option<T>,
    auth_dependent: bool,
    cache_policy: CachePolicy,
    _error: PhantomData<fn() -> E>,
}

impl<T, E, F, Fut> ResourceDescriptor<T, E, F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    pub fn new(cache_key: impl Into<String>, fetch: F) -> Self {
        Self {
            cache_key: cache_key.into(),
            fetch: Arc::new(fetch),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            initial_value: None,
            auth_dependent: true,
            cache_policy: CachePolicy::Plain,
            _error: PhantomData,
        }
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    pub fn auth_dependent(mut self, auth_dependent: bool) -> Self {
        self.auth_dependent = auth_dependent;
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }
}

impl<T: Clone, E, F> Clone for ResourceDescriptor<T, E, F> {
    fn clone(&self) -> Self {
        Self {
            cache_key: self.cache_key.clone(),
            fetch: self.fetch.clone(),
            refresh_interval: self.refresh_interval,
            initial_value: self.initial_value.clone(),
            auth_dependent: self.auth_dependent,
            cache_policy: self.cache_policy.clone(),
            _error: PhantomData,
        }
    }
}

impl<T, E, F, Fut> Resource for ResourceDescriptor<T, E, F>
where
    T: ResourceValueBounds,
    E: ResourceErrorBounds,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Output = T;
    type Error = E;

    fn cache_key(&self) -> String {
        self.cache_key.clone()
    }

    fn fetch(&self) -> impl Future<Output = Result<T, E>> + Send {
        (self.fetch)()
    }

    fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    fn initial_value(&self) -> Option<T> {
        self.initial_value.clone()
    }

    fn auth_dependent(&self) -> bool {
        self.auth_dependent
    }

    fn cache_policy(&self) -> CachePolicy {
        self.cache_policy.clone()
    }
}
