//! # Cache Management for resource-sync
//!
//! This module persists the last-known value of each resource in the durable store,
//! supporting:
//! - **Plain envelopes**: the value serialized as-is, no metadata
//! - **Expiring envelopes**: value + timestamp + owning user id, invalidated after a fixed
//!   age or when the signed-in user changes
//! - **Canonical equality**: values are compared as JSON trees, so map ordering does not
//!   produce spurious writes
//!
//! Unreadable payloads never surface as errors: they are logged and treated as a miss.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use resource_sync::cache::{CachePolicy, ResourceCache};
//! use resource_sync::clock::SystemClock;
//! use resource_sync::store::MemoryStore;
//!
//! # async fn demo() {
//! let cache = ResourceCache::new(MemoryStore::new().into(), Arc::new(SystemClock));
//! cache.persist("answer", &42, &CachePolicy::Plain, None).await.unwrap();
//! let value: Option<i32> = cache.load("answer", &CachePolicy::Plain, None).await;
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{clock::Clock, errors::ProviderResult, store::KeyValueStore};

/// Age after which a document-listing envelope is discarded
pub const DOCUMENTS_MAX_AGE: Duration = Duration::from_secs(30 * 60);

/// How a resource's value is wrapped in the durable store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// The serialized value, reused until replaced
    #[default]
    Plain,
    /// The value wrapped in an [`Envelope`] that stops being served after `max_age`,
    /// or, with `bind_to_identity`, once a different user is signed in
    Expiring {
        max_age: Duration,
        bind_to_identity: bool,
    },
}

impl CachePolicy {
    /// Expiring envelope without identity binding
    pub fn expiring(max_age: Duration) -> Self {
        CachePolicy::Expiring {
            max_age,
            bind_to_identity: false,
        }
    }

    /// Thirty-minute, identity-bound envelope used for document listings
    pub fn documents() -> Self {
        CachePolicy::Expiring {
            max_age: DOCUMENTS_MAX_AGE,
            bind_to_identity: true,
        }
    }

    pub fn is_expiring(&self) -> bool {
        matches!(self, CachePolicy::Expiring { .. })
    }

    pub fn binds_identity(&self) -> bool {
        matches!(
            self,
            CachePolicy::Expiring {
                bind_to_identity: true,
                ..
            }
        )
    }
}

/// A cached value with the metadata needed to expire it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub value: T,
    /// Milliseconds since the Unix epoch when the value was written
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl<T> Envelope<T> {
    pub fn new(value: T, written_at: DateTime<Utc>, user_id: Option<String>) -> Self {
        Self {
            value,
            timestamp: written_at.timestamp_millis(),
            user_id,
        }
    }

    /// Time elapsed since the envelope was written; zero if the stamp is in the future
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now.timestamp_millis().saturating_sub(self.timestamp);
        Duration::from_millis(u64::try_from(elapsed).unwrap_or(0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    pub fn belongs_to(&self, identity: Option<&str>) -> bool {
        self.user_id.as_deref() == identity
    }
}

/// Result of reading a cache slot
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    /// A usable value
    Hit(T),
    /// Nothing stored under the key
    Miss,
    /// An expiring envelope older than its max age
    Expired,
    /// An identity-bound envelope written for another user
    ForeignOwner,
    /// The payload could not be decoded
    Corrupt,
}

impl<T> CacheLookup<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Typed access to resource slots in the durable store
#[derive(Clone)]
pub struct ResourceCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ResourceCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Reads and classifies the slot for `key`.
    ///
    /// Expired and foreign-owner envelopes are removed from the store as a side effect.
    /// Storage read failures are logged and reported as a miss.
    pub async fn lookup<T: DeserializeOwned>(
        &self,
        key: &str,
        policy: &CachePolicy,
        identity: Option<&str>,
    ) -> CacheLookup<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheLookup::Miss,
            Err(_err) => {
                crate::warn_log!("Failed to read cache for key {}: {}", key, _err);
                return CacheLookup::Miss;
            }
        };

        let lookup = match policy {
            CachePolicy::Plain => match serde_json::from_str::<T>(&raw) {
                Ok(value) => CacheLookup::Hit(value),
                Err(_err) => {
                    crate::warn_log!("Discarding unreadable cache for key {}: {}", key, _err);
                    CacheLookup::Corrupt
                }
            },
            CachePolicy::Expiring {
                max_age,
                bind_to_identity,
            } => match serde_json::from_str::<Envelope<T>>(&raw) {
                Ok(envelope) if envelope.is_expired(self.clock.now(), *max_age) => {
                    CacheLookup::Expired
                }
                Ok(envelope) if *bind_to_identity && !envelope.belongs_to(identity) => {
                    CacheLookup::ForeignOwner
                }
                Ok(envelope) => CacheLookup::Hit(envelope.value),
                Err(_err) => {
                    crate::warn_log!("Discarding unreadable envelope for key {}: {}", key, _err);
                    CacheLookup::Corrupt
                }
            },
        };

        if matches!(lookup, CacheLookup::Expired | CacheLookup::ForeignOwner) {
            crate::log_cache_invalidate!("Dropping stale envelope for key: {}", key);
            if let Err(_err) = self.store.remove(key).await {
                crate::warn_log!("Failed to drop stale envelope for key {}: {}", key, _err);
            }
        } else if matches!(lookup, CacheLookup::Hit(_)) {
            crate::log_cache_hit!("Loaded cached value for key: {}", key);
        }
        lookup
    }

    /// Reads the slot for `key`, returning only usable values
    pub async fn load<T: DeserializeOwned>(
        &self,
        key: &str,
        policy: &CachePolicy,
        identity: Option<&str>,
    ) -> Option<T> {
        self.lookup(key, policy, identity).await.into_value()
    }

    /// Writes `value` to the slot for `key`, wrapping it as `policy` requires
    pub async fn persist<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        policy: &CachePolicy,
        identity: Option<&str>,
    ) -> ProviderResult<()> {
        let payload = match policy {
            CachePolicy::Plain => serde_json::to_string(value)?,
            CachePolicy::Expiring {
                bind_to_identity, ..
            } => {
                let owner = bind_to_identity
                    .then(|| identity.map(str::to_string))
                    .flatten();
                serde_json::to_string(&Envelope::new(value, self.clock.now(), owner))?
            }
        };
        self.store.set(key, payload).await?;
        crate::log_cache_store!("Stored value for key: {}", key);
        Ok(())
    }

    pub async fn evict(&self, key: &str) -> ProviderResult<()> {
        self.store.remove(key).await?;
        crate::log_cache_invalidate!("Evicted cache entry for key: {}", key);
        Ok(())
    }
}

/// Compares two values by their canonical JSON form.
///
/// Object keys compare regardless of order. Values that fail to serialize are
/// never considered equal, so they are always written.
pub fn same_value<T: Serialize>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
