//! Authenticated JSON client for resource fetch operations.
//!
//! Every request carries the stored access token as a bearer credential. A missing
//! token fails before anything is sent.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::{
    aggregate::{AGGREGATE_TIMEOUT, fetch_all},
    auth::StoredCredentials,
    errors::{ProviderError, ProviderResult},
};

/// Client for the backend API the resources are fetched from
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    credentials: StoredCredentials,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: StoredCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, credentials)
    }

    /// Use a preconfigured `reqwest::Client`, e.g. with custom timeouts
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: StoredCredentials,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON body.
    ///
    /// ## Errors
    ///
    /// - [`ProviderError::Unauthorized`] if no token is stored or the server answers 401
    /// - [`ProviderError::Http`] for any other non-success status
    /// - [`ProviderError::Fetch`] if the request could not be sent
    /// - [`ProviderError::Serialization`] if the body is not the expected JSON
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ProviderResult<T> {
        let token = self
            .credentials
            .token()
            .await?
            .ok_or(ProviderError::Unauthorized)?;

        let url = self.url(path);
        crate::debug_log!("🌐 [HTTP] GET {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Fetch(format!("GET {url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Fetch(format!("reading body of {url}: {e}")))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET every path concurrently, failing on the first error or after the aggregate timeout
    pub async fn get_json_all<T: DeserializeOwned>(
        &self,
        paths: &[&str],
    ) -> ProviderResult<Vec<T>> {
        self.get_json_all_within(paths, AGGREGATE_TIMEOUT).await
    }

    pub async fn get_json_all_within<T: DeserializeOwned>(
        &self,
        paths: &[&str],
        timeout: Duration,
    ) -> ProviderResult<Vec<T>> {
        fetch_all(paths.iter().map(|path| self.get_json::<T>(path)), timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn joins_paths_without_doubled_slashes() {
        let client = ApiClient::new(
            "http://localhost:8080/api/",
            StoredCredentials::new(MemoryStore::new().into()),
        );
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.url("/demandes/stats"),
            "http://localhost:8080/api/demandes/stats"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let client = ApiClient::new(
            "http://127.0.0.1:9",
            StoredCredentials::new(MemoryStore::new().into()),
        );
        let result: ProviderResult<Vec<u32>> = client.get_json("anything").await;
        assert_eq!(result, Err(ProviderError::Unauthorized));
    }
}
