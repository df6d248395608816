#![doc = include_str!("../README.md")]

// Core modules
pub mod aggregate;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod errors;
pub mod global;
pub mod handle;
#[cfg(feature = "http")]
pub mod http;
mod log_utils;
pub mod notify;
mod provider_state;
pub mod refresh;
pub mod resource;
pub mod runtime;
pub mod state;
pub mod store;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use global::{get_global_runtime, init};
pub use handle::ResourceHandle;
pub use runtime::{ProviderRuntime, ProviderRuntimeConfig};

pub mod prelude {
    //! The prelude exports the types needed to declare, acquire and observe resources.

    // Declaring resources
    pub use crate::cache::CachePolicy;
    pub use crate::resource::{Resource, ResourceDescriptor};

    // The runtime and the handle it hands out
    pub use crate::handle::ResourceHandle;
    pub use crate::runtime::{ProviderRuntime, ProviderRuntimeConfig};

    // Observed state, needed for matching
    pub use crate::state::{AsyncState, FetchOutcome, Phase, SkipReason, Snapshot};

    // Global initialization
    pub use crate::global::{get_global_runtime, init};

    // Storage and auth
    pub use crate::auth::{AuthCheck, StoredCredentials};
    pub use crate::store::{FileStore, KeyValueStore, MemoryStore};

    // Error types
    pub use crate::errors::{ProviderError, ProviderResult};

    #[cfg(feature = "http")]
    pub use crate::http::ApiClient;
}
