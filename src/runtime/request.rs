//! Gated fetch orchestration: auth re-check, single-flight and debounce guards, the
//! remote call, change-gated persistence and publication.

use std::sync::Arc;

use tokio::time::Instant;

use crate::{
    cache::same_value,
    resource::Resource,
    runtime::{instance::ResourceInstance, tasks::ensure_polling_task},
    state::{FetchOutcome, SkipReason},
};

/// Runs a gated fetch and makes sure the polling timer is armed afterwards.
///
/// The timer is armed even when no user is signed in: every tick re-checks auth.
pub(crate) async fn refresh<R: Resource>(
    instance: &Arc<ResourceInstance<R>>,
    force: bool,
) -> FetchOutcome {
    let outcome = run_gated_fetch(instance, force).await;
    if !matches!(
        outcome,
        FetchOutcome::Skipped(SkipReason::TornDown) | FetchOutcome::Discarded
    ) {
        ensure_polling_task(instance);
    }
    outcome
}

/// One attempt at bringing the instance up to date.
///
/// Skipped while another fetch is outstanding, and, unless `force` is set, within the
/// debounce window after the last success. Failures never escape: they are published
/// only when no value is known.
pub(crate) async fn run_gated_fetch<R: Resource>(
    instance: &ResourceInstance<R>,
    force: bool,
) -> FetchOutcome {
    let key = instance.key.as_str();

    if instance.resource.auth_dependent() {
        let authenticated = instance.auth.is_authenticated().await;
        if !authenticated {
            instance.with_state(|s| s.settle_unauthenticated());
            instance.publish();
            crate::log_fetch_skip!("No signed-in user, not fetching key: {}", key);
            return FetchOutcome::Skipped(SkipReason::Unauthenticated);
        }
        instance.with_state(|s| s.set_authenticated(true));
    }

    let debounce = instance.settings.debounce;
    if let Err(reason) = instance.with_state(|s| s.begin_fetch(force, Instant::now(), debounce)) {
        crate::log_fetch_skip!("{:?} for key: {}", reason, key);
        return FetchOutcome::Skipped(reason);
    }
    instance.publish();
    crate::log_fetch_start!("Fetching key: {} (forced: {})", key, force);

    let result = instance.resource.fetch().await;

    if instance.is_torn_down() {
        instance.with_state(|s| s.abandon_fetch());
        crate::debug_log!("🗑️ [FETCH] Discarding late result for released key: {}", key);
        return FetchOutcome::Discarded;
    }

    match result {
        Ok(value) => {
            let changed = instance.with_state(|s| {
                s.known_value()
                    .is_none_or(|current| !same_value(current, &value))
            });

            // Storage first, memory second. Expiring envelopes are re-stamped even when
            // the value is unchanged.
            if changed || instance.policy.is_expiring() {
                let identity = instance.owner_identity().await;
                if let Err(_err) = instance
                    .cache
                    .persist(key, &value, &instance.policy, identity.as_deref())
                    .await
                {
                    crate::warn_log!("Failed to persist key {}: {}", key, _err);
                }
            }

            if instance.is_torn_down() {
                instance.with_state(|s| s.abandon_fetch());
                return FetchOutcome::Discarded;
            }

            instance.with_state(|s| s.finish_success(changed.then_some(value), Instant::now()));
            instance.publish();
            if changed {
                crate::debug_log!("✅ [FETCH] New value published for key: {}", key);
                FetchOutcome::Updated
            } else {
                crate::debug_log!("⏸️ [FETCH] Value unchanged for key: {}", key);
                FetchOutcome::Unchanged
            }
        }
        Err(error) => {
            crate::log_fetch_error!("Fetch failed for key {}: {}", key, error);
            instance.with_state(|s| s.finish_failure(error));
            instance.publish();
            FetchOutcome::Failed
        }
    }
}
