//! Failure classification and token invalidation

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcpreg_core::{ProviderKey, SyncErrorKind, SYNC_ERROR_MESSAGE, UNAUTHORIZED_MESSAGE};
use tests::fixtures::{self, modelscope_body};
use tests::harness::TestServicesBuilder;
use tests::{DomainEvent, MockStore, MockTokenVault};

const MODELSCOPE_PATH: &str = "/api/v1/mcp/services/operational";

#[tokio::test]
async fn rejected_token_is_cleared_and_next_sync_fails_fast() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODELSCOPE_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut t = TestServicesBuilder::new(&server)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::ModelScope, "expired"))
        .build()
        .await;

    let first = t
        .services
        .sync
        .sync_and_merge(ProviderKey::ModelScope, None)
        .await
        .unwrap();

    assert!(!first.success);
    assert_eq!(first.error_kind, Some(SyncErrorKind::Unauthorized));
    assert_eq!(first.message, UNAUTHORIZED_MESSAGE);
    assert!(first.token_cleared);
    assert_eq!(t.vault.token(ProviderKey::ModelScope), None);
    assert!(t
        .events
        .drain()
        .contains(&DomainEvent::ProviderTokenCleared {
            provider: ProviderKey::ModelScope
        }));

    // No request goes out without a token; the mock's expect(1) checks it
    let second = t
        .services
        .sync
        .sync_and_merge(ProviderKey::ModelScope, None)
        .await
        .unwrap();
    assert!(!second.success);
    assert_eq!(second.error_kind, Some(SyncErrorKind::Unauthorized));
    assert!(!second.token_cleared);
}

#[tokio::test]
async fn forbidden_is_treated_like_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/list-servers"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let t = TestServicesBuilder::new(&server)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::McpRouter, "revoked"))
        .build()
        .await;

    let result = t
        .services
        .sync
        .sync_and_merge(ProviderKey::McpRouter, None)
        .await
        .unwrap();

    assert_eq!(result.error_kind, Some(SyncErrorKind::Unauthorized));
    assert_eq!(t.vault.token(ProviderKey::McpRouter), None);
}

#[tokio::test]
async fn server_error_is_transient_and_keeps_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODELSCOPE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let t = TestServicesBuilder::new(&server)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::ModelScope, "good"))
        .build()
        .await;
    t.services
        .registry
        .add(fixtures::discovered("42", "Docs"))
        .await
        .unwrap();

    let result = t
        .services
        .sync
        .sync_and_merge(ProviderKey::ModelScope, None)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(SyncErrorKind::Transient));
    assert_eq!(result.message, SYNC_ERROR_MESSAGE);
    let detail = result.error_detail.unwrap();
    assert!(detail.contains("503"), "{}", detail);
    assert!(detail.contains("maintenance"), "{}", detail);
    assert_eq!(t.vault.token(ProviderKey::ModelScope).as_deref(), Some("good"));
    assert_eq!(t.vault.clear_count(), 0);
    assert_eq!(t.services.registry.len().await, 1);
}

#[tokio::test]
async fn unparseable_body_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODELSCOPE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let t = TestServicesBuilder::new(&server)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::ModelScope, "good"))
        .build()
        .await;

    let result = t.services.sync.preview(ProviderKey::ModelScope, None).await;

    assert_eq!(result.error_kind, Some(SyncErrorKind::Transient));
    assert!(result.added.is_empty());
}

#[tokio::test]
async fn failed_commit_leaves_registry_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODELSCOPE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(modelscope_body(json!([
            {"id": "42", "name": "Docs", "url": "https://x/sse"}
        ]))))
        .mount(&server)
        .await;

    let store = MockStore::new();
    store.fail_writes(true);
    let t = TestServicesBuilder::new(&server)
        .with_store(store)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::ModelScope, "good"))
        .build()
        .await;

    let err = t
        .services
        .sync
        .sync_and_merge(ProviderKey::ModelScope, None)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("persist"), "{}", err);
    assert!(t.services.registry.is_empty().await);
}

#[tokio::test]
async fn sync_all_reports_every_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(MODELSCOPE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(modelscope_body(json!([
            {"id": "42", "name": "Docs", "url": "https://x/sse"}
        ]))))
        .mount(&server)
        .await;

    let t = TestServicesBuilder::new(&server)
        .with_vault(MockTokenVault::new().with_token(ProviderKey::ModelScope, "good"))
        .build()
        .await;

    let results = t.services.sync.sync_all().await;

    assert_eq!(results.len(), ProviderKey::ALL.len());
    for result in &results {
        if result.provider == ProviderKey::ModelScope {
            assert!(result.success);
            assert_eq!(result.added.len(), 1);
        } else {
            // No token stored for the rest
            assert_eq!(result.error_kind, Some(SyncErrorKind::Unauthorized));
        }
    }
    assert!(t.services.registry.contains("@modelscope/42").await);
}
