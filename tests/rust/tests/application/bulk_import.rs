//! Import/export of the mcpServers document

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::Value;
use wiremock::MockServer;

use mcpreg_core::ImportError;
use tests::async_helpers::{with_timeout, DEFAULT_TIMEOUT};
use tests::fixtures::{discovered, user_stdio};
use tests::harness::TestServicesBuilder;
use tests::{LifecycleState, Origin, ScriptedProbe, ServerRecord, TransportType};

const DOCUMENT: &str = r#"{
  "mcpServers": {
    "fetch": { "command": "uvx", "args": ["mcp-server-fetch"] },
    "docs": { "name": "Docs", "url": "https://docs.example/sse", "isActive": true },
    "api": {
      "type": "streamableHttp",
      "baseUrl": "https://api.example/mcp",
      "headers": { "Authorization": "Bearer abc" }
    }
  }
}"#;

#[tokio::test]
async fn import_inserts_every_entry_as_imported() {
    let server = MockServer::start().await;
    let t = TestServicesBuilder::new(&server).build().await;

    let report = t.services.sync.import_json(DOCUMENT).await.unwrap();

    assert_eq!(report.imported, vec!["fetch", "docs", "api"]);
    assert!(report.failed.is_empty());

    let fetch = t.services.registry.get("fetch").await.unwrap();
    assert_eq!(fetch.transport_type, TransportType::Stdio);
    assert_eq!(fetch.endpoint.args, vec!["mcp-server-fetch".to_string()]);
    assert_eq!(fetch.origin, Origin::Imported);

    let docs = t.services.registry.get("docs").await.unwrap();
    assert_eq!(docs.transport_type, TransportType::Sse);

    let api = t.services.registry.get("api").await.unwrap();
    assert_eq!(
        api.endpoint.headers.get("Authorization").map(String::as_str),
        Some("Bearer abc")
    );
}

#[tokio::test]
async fn import_probes_entries_that_ask_to_be_active() {
    let server = MockServer::start().await;
    let t = TestServicesBuilder::new(&server)
        .with_probe(Arc::new(ScriptedProbe::reachable()))
        .build()
        .await;

    let report = t.services.sync.import_json(DOCUMENT).await.unwrap();

    assert_eq!(report.probes.len(), 1);
    for probe in report.probes {
        assert_eq!(probe.server_id(), "docs");
        assert_eq!(
            with_timeout(DEFAULT_TIMEOUT, probe.wait()).await,
            Some(LifecycleState::Active)
        );
    }
    assert!(t.services.registry.get("docs").await.unwrap().is_active);
    assert!(!t.services.registry.get("fetch").await.unwrap().is_active);
}

#[tokio::test]
async fn duplicate_ids_are_reported_per_entry() {
    let server = MockServer::start().await;
    let t = TestServicesBuilder::new(&server).build().await;
    t.services.registry.add(user_stdio("fetch", "mine")).await.unwrap();

    let report = t.services.sync.import_json(DOCUMENT).await.unwrap();

    assert_eq!(report.imported, vec!["docs", "api"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].id, "fetch");
    assert!(report.failed[0].reason.contains("already exists"));
    assert_eq!(
        t.services.registry.get("fetch").await.unwrap().endpoint.command.as_deref(),
        Some("mine")
    );
}

#[tokio::test]
async fn invalid_document_imports_nothing() {
    let server = MockServer::start().await;
    let t = TestServicesBuilder::new(&server).build().await;

    let err = t
        .services
        .sync
        .import_json(
            r#"{"mcpServers": {
                "good": {"command": "uvx"},
                "bad": {"type": "carrier-pigeon", "url": "https://x"}
            }}"#,
        )
        .await
        .unwrap_err();

    let ImportError::Validation { diagnostic } = err;
    assert!(diagnostic.contains("\"bad\""), "{}", diagnostic);
    assert!(diagnostic.contains("carrier-pigeon"), "{}", diagnostic);
    assert!(t.services.registry.is_empty().await);
}

#[tokio::test]
async fn syntax_error_points_at_position() {
    let server = MockServer::start().await;
    let t = TestServicesBuilder::new(&server).build().await;

    let err = t
        .services
        .sync
        .import_json("{\n  \"mcpServers\": {\n    \"a\": \n  }\n}")
        .await
        .unwrap_err();

    assert!(err.to_string().contains("line 4"), "{}", err);
}

#[tokio::test]
async fn export_then_import_reproduces_the_registry() {
    let server = MockServer::start().await;
    let source = TestServicesBuilder::new(&server).build().await;
    source
        .services
        .registry
        .add(discovered("42", "Docs").with_tags(vec!["search".into()]))
        .await
        .unwrap();
    source
        .services
        .registry
        .add(user_stdio("local-git", "git-mcp"))
        .await
        .unwrap();

    let exported = source.services.sync.export_json().await.unwrap();

    let document: Value = serde_json::from_str(&exported).unwrap();
    let keys: Vec<&String> = document["mcpServers"].as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["@modelscope/42", "local-git"]);
    assert_eq!(document["mcpServers"]["@modelscope/42"]["type"], "sse");

    let target = TestServicesBuilder::new(&server).build().await;
    target.services.sync.import_json(&exported).await.unwrap();

    let shape = |records: Vec<ServerRecord>| {
        records
            .into_iter()
            .map(|r| (r.id, r.name, r.transport_type, r.endpoint))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        shape(target.services.registry.list().await),
        shape(source.services.registry.list().await)
    );

    let docs = target.services.registry.get("@modelscope/42").await.unwrap();
    let original = source.services.registry.get("@modelscope/42").await.unwrap();
    assert_eq!(docs.tags, original.tags);
    assert_eq!(docs.provider, original.provider);
    assert_eq!(docs.origin, Origin::Imported);
    assert_eq!(
        target.services.registry.get("local-git").await.unwrap().origin,
        Origin::Imported
    );
}
