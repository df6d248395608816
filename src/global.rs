//! # Global Runtime Management
//!
//! This module provides an optional process-wide [`ProviderRuntime`] for applications
//! that want one registry shared by every screen without threading it through.

use std::sync::OnceLock;

use crate::runtime::{ProviderRuntime, ProviderRuntimeConfig};

/// Error type for global runtime operations
#[derive(Debug, thiserror::Error)]
pub enum GlobalProviderError {
    #[error("Global runtime not initialized. Call resource_sync::init() first.")]
    NotInitialized,
    #[error("Global runtime already initialized")]
    AlreadyInitialized,
}

/// Global singleton instance of the provider runtime
static GLOBAL_RUNTIME: OnceLock<ProviderRuntime> = OnceLock::new();

/// Initialize the global runtime with `config`
///
/// Call once at application startup, before any screen acquires a resource.
///
/// ## Example
///
/// ```rust,no_run
/// use resource_sync::{ProviderRuntimeConfig, init};
/// use resource_sync::store::MemoryStore;
///
/// init(ProviderRuntimeConfig::new().with_store(MemoryStore::new())).unwrap();
/// ```
///
/// ## Errors
///
/// Returns `GlobalProviderError::AlreadyInitialized` on a second call.
pub fn init(
    config: ProviderRuntimeConfig,
) -> Result<&'static ProviderRuntime, GlobalProviderError> {
    let mut created = false;
    let runtime = GLOBAL_RUNTIME.get_or_init(|| {
        created = true;
        ProviderRuntime::new(config)
    });
    if created {
        crate::debug_log!("🚀 [GLOBAL] Runtime initialized");
        Ok(runtime)
    } else {
        Err(GlobalProviderError::AlreadyInitialized)
    }
}

/// Get the global runtime instance
///
/// ## Errors
///
/// Returns `GlobalProviderError::NotInitialized` if `init()` has not been called yet.
pub fn get_global_runtime() -> Result<&'static ProviderRuntime, GlobalProviderError> {
    GLOBAL_RUNTIME
        .get()
        .ok_or(GlobalProviderError::NotInitialized)
}

/// Check if the global runtime has been initialized
pub fn is_initialized() -> bool {
    GLOBAL_RUNTIME.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_runtime_initializes_once() {
        // Other tests in this binary may have initialized it already.
        if !is_initialized() {
            assert!(matches!(
                get_global_runtime(),
                Err(GlobalProviderError::NotInitialized)
            ));
            init(ProviderRuntimeConfig::new()).unwrap();
        }

        assert!(is_initialized());
        assert!(get_global_runtime().is_ok());
        assert!(matches!(
            init(ProviderRuntimeConfig::new()),
            Err(GlobalProviderError::AlreadyInitialized)
        ));
    }
}
