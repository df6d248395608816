//! # Push notification bridge
//!
//! The push channel (a persistent connection subscribed to a per-user topic) is owned
//! by the application. This module turns its records into forced refreshes of the
//! resources they concern, while polling stays in place as the fallback for whatever
//! the channel misses.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures::stream;
//! use resource_sync::notify::{Notification, forward_notifications};
//! use resource_sync::ProviderRuntime;
//!
//! # fn demo(runtime: &ProviderRuntime, records: Vec<Notification>) {
//! forward_notifications(runtime, "push", stream::iter(records), |_n: &Notification| {
//!     vec!["requests".to_string(), "notifications".to_string()]
//! });
//! # }
//! ```

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{refresh::TaskType, runtime::ProviderRuntime};

/// One record delivered by the push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub created_at: String,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personnel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_soc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
}

/// Topic carrying notifications for one user
pub fn notification_topic(user_id: &str) -> String {
    format!("/topic/notifications/{user_id}")
}

/// Inserts `incoming` at the front of `feed` unless a record with the same id is present.
///
/// Returns true if the record was new.
pub fn merge_notification(feed: &mut Vec<Notification>, incoming: Notification) -> bool {
    if feed.iter().any(|existing| existing.id == incoming.id) {
        return false;
    }
    feed.insert(0, incoming);
    true
}

pub fn unviewed_count(feed: &[Notification]) -> usize {
    feed.iter().filter(|n| !n.viewed).count()
}

/// Spawns a task that force-refreshes the keys `route` returns for each record.
///
/// The task is registered under `name` as [`TaskType::PushForward`] and ends with the
/// stream. Keys that are not live are ignored. Returns false if a forwarder with the
/// same name is already running.
pub fn forward_notifications<S, N, F>(
    runtime: &ProviderRuntime,
    name: &str,
    notifications: S,
    route: F,
) -> bool
where
    S: Stream<Item = N> + Send + 'static,
    N: Send + 'static,
    F: Fn(&N) -> Vec<String> + Send + 'static,
{
    let target = runtime.clone();
    let _name = name.to_string();
    runtime.refresh_registry().start_task(name, TaskType::PushForward, async move {
        let mut notifications = Box::pin(notifications);
        while let Some(record) = notifications.next().await {
            for key in route(&record) {
                match target.refresh_key(&key, true).await {
                    Some(_outcome) => {
                        crate::debug_log!(
                            "📨 [PUSH] {} refreshed {} ({:?})",
                            _name,
                            key,
                            _outcome
                        );
                    }
                    None => {
                        crate::debug_log!("📨 [PUSH] {} ignored {}: not live", _name, key);
                    }
                }
            }
        }
        crate::debug_log!("📨 [PUSH] {} stream ended", _name);
    })
}

/// Stops the forwarder registered under `name`
pub fn stop_forwarding(runtime: &ProviderRuntime, name: &str) -> bool {
    runtime
        .refresh_registry()
        .stop_task(name, TaskType::PushForward)
}
