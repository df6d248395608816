//! Error types for resource-sync
//!
//! [`ProviderError`] is the single error type flowing through the crate: stores, the auth
//! check, the bundled HTTP helper and aggregation all report it. It is `Clone + PartialEq`
//! so it can travel inside a published [`Snapshot`](crate::state::Snapshot).

use std::time::Duration;

/// Errors produced by stores, fetch helpers and runtime construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The remote call failed before producing a response
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// The backend answered with a non-success status
    #[error("backend returned HTTP {status}")]
    Http { status: u16 },
    /// Credentials are missing or were rejected by the backend
    #[error("authentication required")]
    Unauthorized,
    /// The request did not complete within the allotted time
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The durable key-value store failed
    #[error("storage error: {0}")]
    Storage(String),
    /// A value could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The runtime or a resource was set up incorrectly
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A cache key is already owned by a live resource of another type
    #[error("cache key '{key}' is already in use by a resource of a different type")]
    KeyConflict { key: String },
}

impl ProviderError {
    /// Returns true for failures worth retrying at the next poll
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Fetch(_)
                | ProviderError::Http { .. }
                | ProviderError::Unauthorized
                | ProviderError::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ProviderError {
    fn from(err: std::io::Error) -> Self {
        ProviderError::Storage(err.to_string())
    }
}

/// Result alias used throughout the crate
pub type ProviderResult<T> = Result<T, ProviderError>;
