#![cfg(feature = "http")]

use resource_sync::errors::ProviderError;
use resource_sync::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestStats {
    pending: u32,
    approved: u32,
    rejected: u32,
}

const STATS_BODY: &str = r#"{"pending":2,"approved":5,"rejected":1}"#;

async fn signed_in_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set("userInfo", r#"{"id":"42"}"#.to_string()).await.unwrap();
    store.set("userToken", "token-abc".to_string()).await.unwrap();
    store.set("userId", "42".to_string()).await.unwrap();
    store
}

async fn client_for(server: &mockito::Server) -> (MemoryStore, ApiClient) {
    let store = signed_in_store().await;
    let client = ApiClient::new(server.url(), StoredCredentials::new(store.clone().into()));
    (store, client)
}

#[tokio::test]
async fn sends_bearer_token_and_decodes_json() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/demandes/stats")
        .match_header("authorization", "Bearer token-abc")
        .with_header("Content-Type", "application/json")
        .with_body(STATS_BODY)
        .create_async()
        .await;

    let (_store, client) = client_for(&server).await;
    let stats: RequestStats = client.get_json("/demandes/stats").await.unwrap();
    assert_eq!(
        stats,
        RequestStats {
            pending: 2,
            approved: 5,
            rejected: 1
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn maps_status_codes_to_errors() {
    let mut server = mockito::Server::new_async().await;
    let _expired = server
        .mock("GET", "/profile")
        .with_status(401)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/documents")
        .with_status(503)
        .create_async()
        .await;
    let _garbled = server
        .mock("GET", "/calendar")
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let (_store, client) = client_for(&server).await;
    assert_eq!(
        client.get_json::<RequestStats>("profile").await,
        Err(ProviderError::Unauthorized)
    );
    assert_eq!(
        client.get_json::<RequestStats>("documents").await,
        Err(ProviderError::Http { status: 503 })
    );
    assert!(matches!(
        client.get_json::<RequestStats>("calendar").await,
        Err(ProviderError::Serialization(_))
    ));
}

#[tokio::test]
async fn missing_token_never_reaches_the_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/demandes/stats")
        .expect(0)
        .create_async()
        .await;

    let client = ApiClient::new(
        server.url(),
        StoredCredentials::new(MemoryStore::new().into()),
    );
    assert_eq!(
        client.get_json::<RequestStats>("demandes/stats").await,
        Err(ProviderError::Unauthorized)
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn aggregated_calls_keep_order_and_fail_together() {
    let mut server = mockito::Server::new_async().await;
    let _leaves = server
        .mock("GET", "/conges/count")
        .with_body("3")
        .create_async()
        .await;
    let _trainings = server
        .mock("GET", "/formations/count")
        .with_body("7")
        .create_async()
        .await;
    let _down = server
        .mock("GET", "/documents/count")
        .with_status(500)
        .create_async()
        .await;

    let (_store, client) = client_for(&server).await;
    let counts: Vec<u32> = client
        .get_json_all(&["conges/count", "formations/count"])
        .await
        .unwrap();
    assert_eq!(counts, vec![3, 7]);

    assert_eq!(
        client
            .get_json_all::<u32>(&["conges/count", "documents/count"])
            .await,
        Err(ProviderError::Http { status: 500 })
    );
}

#[tokio::test]
async fn runtime_fetches_through_the_api_client() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/demandes/stats")
        .match_header("authorization", "Bearer token-abc")
        .with_body(STATS_BODY)
        .create_async()
        .await;

    let store = signed_in_store().await;
    let runtime = ProviderRuntime::new(ProviderRuntimeConfig::new().with_store(store.clone()));
    let client = ApiClient::new(server.url(), StoredCredentials::new(store.clone().into()));
    let stats = ResourceDescriptor::new("request-stats", move || {
        let client = client.clone();
        async move { client.get_json::<RequestStats>("demandes/stats").await }
    });

    let handle = runtime.acquire(stats).await.unwrap();
    let snapshot = handle.settled().await;
    assert_eq!(snapshot.data.map(|s| s.approved), Some(5));
    assert_eq!(snapshot.phase, Phase::Ready);
    assert!(
        store
            .get("request-stats")
            .await
            .unwrap()
            .is_some_and(|raw| raw.contains("\"approved\":5"))
    );
    mock.assert_async().await;
}
