//! Cache-first hydration owned by the runtime.

use crate::{resource::Resource, runtime::instance::ResourceInstance};

/// Publishes the persisted value for `instance`, once per instance lifetime.
///
/// Runs before the first network attempt. Missing, unreadable, expired or foreign
/// envelopes leave the seed value in place.
pub(crate) async fn hydrate_from_cache<R: Resource>(instance: &ResourceInstance<R>) {
    if instance.with_state(|s| s.cache_loaded()) {
        return;
    }

    let identity = instance.owner_identity().await;
    let cached = instance
        .cache
        .load::<R::Output>(&instance.key, &instance.policy, identity.as_deref())
        .await;

    #[cfg(feature = "tracing")]
    let hit = cached.is_some();
    if instance.with_state(|s| s.hydrate(cached)) {
        instance.publish();
        #[cfg(feature = "tracing")]
        crate::debug_log!(
            "📦 [HYDRATE] Key: {} hydrated from cache (hit: {})",
            instance.key,
            hit
        );
    }
}
