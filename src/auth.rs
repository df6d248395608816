//! Authentication check consulted by auth-dependent resources
//!
//! The check has no side effects: it only reports whether a signed-in user is present.
//! [`StoredCredentials`] answers it from the same durable store the resources cache into,
//! where the sign-in flow leaves the user record, the access token and the user id.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{errors::ProviderResult, store::KeyValueStore};

/// Query answering whether a user is signed in
pub trait AuthCheck: Send + Sync {
    /// True when a user identity, access token and user id are all present
    fn is_authenticated(&self) -> BoxFuture<'_, bool>;

    /// Id of the signed-in user, if any. Used to bind expiring envelopes to an owner.
    fn identity(&self) -> BoxFuture<'_, Option<String>>;
}

/// Store keys holding the credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    pub user_info: String,
    pub token: String,
    pub user_id: String,
}

impl Default for CredentialKeys {
    fn default() -> Self {
        Self {
            user_info: "userInfo".to_string(),
            token: "userToken".to_string(),
            user_id: "userId".to_string(),
        }
    }
}

/// Credentials read from a [`KeyValueStore`]
#[derive(Clone)]
pub struct StoredCredentials {
    store: Arc<dyn KeyValueStore>,
    keys: CredentialKeys,
}

impl StoredCredentials {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_keys(store, CredentialKeys::default())
    }

    pub fn with_keys(store: Arc<dyn KeyValueStore>, keys: CredentialKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &CredentialKeys {
        &self.keys
    }

    /// The bearer token, if one is stored
    pub async fn token(&self) -> ProviderResult<Option<String>> {
        self.non_empty(&self.keys.token).await
    }

    pub async fn user_id(&self) -> ProviderResult<Option<String>> {
        self.non_empty(&self.keys.user_id).await
    }

    async fn non_empty(&self, key: &str) -> ProviderResult<Option<String>> {
        Ok(self
            .store
            .get(key)
            .await?
            .filter(|value| !value.trim().is_empty()))
    }

    async fn all_present(&self) -> ProviderResult<bool> {
        for key in [&self.keys.user_info, &self.keys.token, &self.keys.user_id] {
            if self.non_empty(key).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl AuthCheck for StoredCredentials {
    fn is_authenticated(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match self.all_present().await {
                Ok(present) => present,
                Err(_err) => {
                    crate::warn_log!("Auth check could not read credentials: {}", _err);
                    false
                }
            }
        })
    }

    fn identity(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move { self.user_id().await.ok().flatten() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn signed_in_store() -> MemoryStore {
        MemoryStore::with_entries([
            ("userInfo", r#"{"id":"42","role":"Collaborateur"}"#),
            ("userToken", "token-abc"),
            ("userId", "42"),
        ])
    }

    #[tokio::test]
    async fn authenticated_when_all_credentials_present() {
        let credentials = StoredCredentials::new(signed_in_store().into());
        assert!(credentials.is_authenticated().await);
        assert_eq!(credentials.identity().await.as_deref(), Some("42"));
        assert_eq!(
            credentials.token().await.unwrap().as_deref(),
            Some("token-abc")
        );
    }

    #[tokio::test]
    async fn missing_or_blank_token_is_not_authenticated() {
        let store = signed_in_store();
        store.set("userToken", "  ".to_string()).await.unwrap();
        let credentials = StoredCredentials::new(store.clone().into());
        assert!(!credentials.is_authenticated().await);

        store.remove("userToken").await.unwrap();
        assert!(!credentials.is_authenticated().await);
    }

    #[tokio::test]
    async fn custom_key_names() {
        let store = MemoryStore::with_entries([("me", "{}"), ("jwt", "t"), ("uid", "7")]);
        let keys = CredentialKeys {
            user_info: "me".into(),
            token: "jwt".into(),
            user_id: "uid".into(),
        };
        let credentials = StoredCredentials::with_keys(store.into(), keys);
        assert!(credentials.is_authenticated().await);
        assert_eq!(credentials.identity().await.as_deref(), Some("7"));
    }
}
