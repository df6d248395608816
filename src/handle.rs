//! Caller-side handle on a synchronized resource.
//!
//! A [`ResourceHandle`] is what a screen holds while it shows a resource. Cloning it
//! registers another holder; dropping the last holder tears the instance down.

use std::{fmt, sync::Arc};

use tokio::sync::watch;

use crate::{
    runtime::{ProviderRuntime, instance::SharedInstance},
    state::{FetchOutcome, Phase, Snapshot},
};

pub struct ResourceHandle<T: 'static, E: 'static> {
    instance: Arc<dyn SharedInstance<T, E>>,
    runtime: ProviderRuntime,
}

impl<T: Clone + 'static, E: Clone + 'static> ResourceHandle<T, E> {
    pub(crate) fn new(instance: Arc<dyn SharedInstance<T, E>>, runtime: ProviderRuntime) -> Self {
        Self { instance, runtime }
    }

    pub fn cache_key(&self) -> &str {
        self.instance.key()
    }

    /// Current published state
    pub fn snapshot(&self) -> Snapshot<T, E> {
        self.instance.snapshot()
    }

    pub fn data(&self) -> Option<T> {
        self.snapshot().data
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot().loading
    }

    /// The caller-visible error: set only when no value is known and a fetch failed
    pub fn error(&self) -> Option<E> {
        self.snapshot().error
    }

    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    /// Most recent fetch failure, including failures hidden because a value was known
    pub fn diagnostic_error(&self) -> Option<E> {
        self.instance.last_failure()
    }

    /// False while an auth-dependent resource is waiting for a signed-in user
    pub fn is_authenticated(&self) -> bool {
        self.instance.is_authenticated()
    }

    /// True once a fetch has succeeded for this instance; a cache hit does not count
    pub fn has_fetched(&self) -> bool {
        self.instance.has_fetched()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T, E>> {
        self.instance.subscribe()
    }

    /// Gated fetch on demand. `force` bypasses the debounce window, not the in-flight guard.
    pub async fn refresh(&self, force: bool) -> FetchOutcome {
        self.instance.clone().refresh(force).await
    }

    /// Waits until the first resolution from cache or network
    pub async fn settled(&self) -> Snapshot<T, E> {
        self.wait_for(|snapshot| !snapshot.loading).await
    }

    /// Waits until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&Snapshot<T, E>) -> bool,
    ) -> Snapshot<T, E> {
        let mut receiver = self.subscribe();
        // The receiver may predate the latest publish; check the live state first.
        let current = self.snapshot();
        if predicate(&current) {
            return current;
        }
        match receiver.wait_for(|snapshot| predicate(snapshot)).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }
}

impl<T: 'static, E: 'static> Clone for ResourceHandle<T, E> {
    fn clone(&self) -> Self {
        self.runtime.retain(self.instance.key(), self.instance.id());
        Self {
            instance: self.instance.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T: 'static, E: 'static> Drop for ResourceHandle<T, E> {
    fn drop(&mut self) {
        self.runtime.release(self.instance.key(), self.instance.id());
    }
}

impl<T: 'static, E: 'static> fmt::Debug for ResourceHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("cache_key", &self.instance.key())
            .finish_non_exhaustive()
    }
}
