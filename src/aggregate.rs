//! Aggregation of several remote calls into one resource value.
//!
//! Dashboards often combine a handful of endpoints into a single resource. The calls
//! run concurrently and the whole batch is cancelled if it outlives the timeout, so one
//! hung endpoint cannot hold the resource's in-flight slot indefinitely.

use std::{future::Future, time::Duration};

use futures::future::try_join_all;

use crate::errors::{ProviderError, ProviderResult};

/// Time allowed for an aggregated batch
pub const AGGREGATE_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs every request concurrently, failing on the first error or on timeout.
///
/// Results keep the order of `requests`. On timeout all outstanding requests are dropped.
pub async fn fetch_all<I, Fut, T, E>(requests: I, timeout: Duration) -> ProviderResult<Vec<T>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T, E>>,
    E: Into<ProviderError>,
{
    let batch = try_join_all(
        requests
            .into_iter()
            .map(|request| async move {
                let result: ProviderResult<T> = request.await.map_err(Into::into);
                result
            }),
    );
    match tokio::time::timeout(timeout, batch).await {
        Ok(result) => result,
        Err(_) => {
            crate::warn_log!("Aggregated fetch cancelled after {:?}", timeout);
            Err(ProviderError::Timeout(timeout))
        }
    }
}
