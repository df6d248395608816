//! Common types and aliases used throughout resource-sync

use serde::{Serialize, de::DeserializeOwned};

/// Common trait bounds for resource values
///
/// Values are cloned into snapshots and serialized losslessly into the durable store.
pub trait ResourceValueBounds: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}
impl<T> ResourceValueBounds for T where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Common trait bounds for resource fetch errors
pub trait ResourceErrorBounds: Clone + std::fmt::Display + Send + Sync + 'static {}
impl<T> ResourceErrorBounds for T where T: Clone + std::fmt::Display + Send + Sync + 'static {}
