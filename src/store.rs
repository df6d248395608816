//! # Durable key-value stores
//!
//! Resources persist their last-known value through a [`KeyValueStore`]. The store is
//! shared process-wide and keyed by cache key; values are opaque text payloads.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: in-process map, the default and the usual test double
//! - [`FileStore`]: one file per key under a directory, written atomically
//!
//! ## Example
//! ```rust,no_run
//! use resource_sync::store::{KeyValueStore, MemoryStore};
//!
//! # async fn demo() -> resource_sync::errors::ProviderResult<()> {
//! let store = MemoryStore::new();
//! store.set("theme", "dark".to_string()).await?;
//! assert_eq!(store.get("theme").await?, Some("dark".to_string()));
//! # Ok(())
//! # }
//! ```

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use futures::future::BoxFuture;

use crate::errors::ProviderResult;

/// Asynchronous string key-value store
pub trait KeyValueStore: Send + Sync {
    /// Reads the payload stored under `key`
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<Option<String>>>;

    /// Replaces the payload stored under `key`
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes `key`; deleting a missing key is not an error
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes every key
    fn clear(&self) -> BoxFuture<'_, ProviderResult<()>>;
}

/// In-memory store backed by a shared map
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
        }
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        let value = self.lock().get(key).cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ProviderResult<()>> {
        self.lock().insert(key.to_string(), value);
        Box::pin(async { Ok(()) })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        self.lock().remove(key);
        Box::pin(async { Ok(()) })
    }

    fn clear(&self) -> BoxFuture<'_, ProviderResult<()>> {
        self.lock().clear();
        Box::pin(async { Ok(()) })
    }
}

const ENTRY_EXTENSION: &str = "json";

/// Durable store keeping one file per key inside a directory
///
/// File names are the hex encoding of the key so any key string is safe on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> ProviderResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{ENTRY_EXTENSION}", hex::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<Option<String>>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.entry_path(key)).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let path = self.entry_path(key);
            let staging = path.with_extension("tmp");
            tokio::fs::write(&staging, value).await?;
            tokio::fs::rename(&staging, &path).await?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.entry_path(key)).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn clear(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(&self.root).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                    tokio::fs::remove_file(&path).await?;
                }
            }
            Ok(())
        })
    }
}

impl From<MemoryStore> for Arc<dyn KeyValueStore> {
    fn from(store: MemoryStore) -> Self {
        Arc::new(store)
    }
}

impl From<FileStore> for Arc<dyn KeyValueStore> {
    fn from(store: FileStore) -> Self {
        Arc::new(store)
    }
}
