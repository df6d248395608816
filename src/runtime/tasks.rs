//! Polling timer for resource instances.

use std::sync::Arc;

use crate::{
    refresh::TaskType,
    resource::Resource,
    runtime::{instance::ResourceInstance, request::run_gated_fetch},
};

/// Arms the periodic refresh for `instance` unless it is already running.
///
/// The task holds only a weak reference, so it never keeps a released instance alive.
pub(crate) fn ensure_polling_task<R: Resource>(instance: &Arc<ResourceInstance<R>>) {
    let registry = &instance.registry;
    let key = instance.key.as_str();
    if instance.is_torn_down() || registry.has_task(key, TaskType::Polling) {
        return;
    }

    let period = instance
        .settings
        .effective_interval(instance.resource.refresh_interval());
    let weak = Arc::downgrade(instance);
    registry.start_owned_periodic_task(key, TaskType::Polling, instance.id, period, move || {
        let weak = weak.clone();
        async move {
            if let Some(instance) = weak.upgrade() {
                run_gated_fetch(&instance, false).await;
            }
        }
    });

    // Teardown may have raced past the check above. A task under the same key armed
    // by a newer instance is left alone.
    if instance.is_torn_down() {
        registry.stop_owned_task(key, TaskType::Polling, instance.id);
    }
}
