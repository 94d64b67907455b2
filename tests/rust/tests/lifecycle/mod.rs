//! LifecycleController tests
//!
//! Probe outcomes, quiet failures for servers that may need setup, and
//! late probe results that must not resurrect a server.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use mcpreg_core::{EventBus, EventReceiver, LifecycleController, RegistryError, ServerRegistry};
use tests::async_helpers::{with_timeout, DEFAULT_TIMEOUT};
use tests::events::states_for;
use tests::fixtures::{discovered, user_remote, user_stdio};
use tests::{DomainEvent, LifecycleState, MockStore, RecordingRuntime, ScriptedProbe};

struct Setup {
    registry: Arc<ServerRegistry>,
    lifecycle: LifecycleController,
    probe: Arc<ScriptedProbe>,
    runtime: Arc<RecordingRuntime>,
    events: EventReceiver,
}

async fn setup(probe: ScriptedProbe) -> Setup {
    let bus = EventBus::new();
    let events = bus.subscribe();
    let registry = Arc::new(
        ServerRegistry::load(Arc::new(MockStore::new()))
            .await
            .unwrap()
            .with_events(bus.sender()),
    );
    let probe = Arc::new(probe);
    let runtime = Arc::new(RecordingRuntime::new());
    let lifecycle = LifecycleController::new(
        registry.clone(),
        probe.clone(),
        runtime.clone(),
        bus.sender(),
    );

    Setup {
        registry,
        lifecycle,
        probe,
        runtime,
        events,
    }
}

fn status_events(events: &mut EventReceiver) -> Vec<DomainEvent> {
    events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, DomainEvent::ServerStatusChanged { .. }))
        .collect()
}

#[tokio::test]
async fn reachable_server_becomes_active() {
    let mut s = setup(ScriptedProbe::reachable()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    let handle = s.lifecycle.activate("local-git").await.unwrap();
    let state = with_timeout(DEFAULT_TIMEOUT, handle.wait()).await;

    assert_eq!(state, Some(LifecycleState::Active));
    assert!(s.registry.get("local-git").await.unwrap().is_active);
    assert_eq!(s.lifecycle.state("local-git").await, LifecycleState::Active);
    assert_eq!(
        states_for(&s.events.drain(), "local-git"),
        vec![LifecycleState::Probing, LifecycleState::Active]
    );
}

#[tokio::test]
async fn unreachable_user_server_alerts() {
    let mut s = setup(ScriptedProbe::unreachable("HTTP 502")).await;
    s.registry
        .add(user_remote("local-api", "https://api/mcp"))
        .await
        .unwrap();

    let handle = s.lifecycle.activate("local-api").await.unwrap();
    let state = with_timeout(DEFAULT_TIMEOUT, handle.wait()).await;

    assert_eq!(state, Some(LifecycleState::Inactive));
    assert!(!s.registry.get("local-api").await.unwrap().is_active);
    assert_eq!(
        status_events(&mut s.events).last(),
        Some(&DomainEvent::ServerStatusChanged {
            server_id: "local-api".into(),
            state: LifecycleState::Inactive,
            notify_user: true,
            detail: Some("HTTP 502".into()),
        })
    );
}

#[tokio::test]
async fn unreachable_discovered_or_packaged_server_stays_quiet() {
    let mut s = setup(ScriptedProbe::unreachable("timed out")).await;
    s.registry.add(discovered("42", "Docs")).await.unwrap();
    s.registry
        .add(user_stdio("local-dxt", "node").with_dxt_path("/tmp/pkg.dxt"))
        .await
        .unwrap();

    for id in ["@modelscope/42", "local-dxt"] {
        let handle = s.lifecycle.activate(id).await.unwrap();
        assert_eq!(handle.wait().await, Some(LifecycleState::Inactive));
    }

    let quiet = status_events(&mut s.events)
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                DomainEvent::ServerStatusChanged {
                    state: LifecycleState::Inactive,
                    notify_user: false,
                    ..
                }
            )
        })
        .count();
    assert_eq!(quiet, 2);
}

#[tokio::test]
async fn deactivate_while_probing_discards_result() {
    let s = setup(ScriptedProbe::reachable().gated()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    let handle = s.lifecycle.activate("local-git").await.unwrap();
    assert_eq!(s.lifecycle.state("local-git").await, LifecycleState::Probing);

    s.lifecycle.deactivate("local-git").await.unwrap();
    s.probe.release();

    assert_eq!(with_timeout(DEFAULT_TIMEOUT, handle.wait()).await, None);
    assert!(!s.registry.get("local-git").await.unwrap().is_active);
    assert_eq!(s.lifecycle.state("local-git").await, LifecycleState::Inactive);
}

#[tokio::test]
async fn deactivate_active_server_stops_it() {
    let s = setup(ScriptedProbe::reachable()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();
    s.lifecycle
        .activate("local-git")
        .await
        .unwrap()
        .wait()
        .await;

    s.lifecycle.deactivate("local-git").await.unwrap();

    assert_eq!(s.runtime.stopped(), vec!["local-git".to_string()]);
    assert!(!s.registry.get("local-git").await.unwrap().is_active);
}

#[tokio::test]
async fn deactivate_inactive_server_does_not_touch_runtime() {
    let s = setup(ScriptedProbe::reachable()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    s.lifecycle.deactivate("local-git").await.unwrap();

    assert!(s.runtime.stopped().is_empty());
}

#[tokio::test]
async fn remove_while_probing_never_resurrects() {
    let s = setup(ScriptedProbe::reachable().gated()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    let handle = s.lifecycle.activate("local-git").await.unwrap();
    let removed = s.lifecycle.remove("local-git").await.unwrap();
    s.probe.release();

    assert_eq!(removed.id, "local-git");
    assert_eq!(with_timeout(DEFAULT_TIMEOUT, handle.wait()).await, None);
    assert!(!s.registry.contains("local-git").await);
}

#[tokio::test]
async fn stale_result_ignored_after_remove_and_readd() {
    let s = setup(ScriptedProbe::reachable().gated()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    let stale = s.lifecycle.activate("local-git").await.unwrap();
    s.lifecycle.remove("local-git").await.unwrap();

    // Same id again, last intent is "off"
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();
    s.lifecycle.deactivate("local-git").await.unwrap();
    s.probe.release();

    assert_eq!(with_timeout(DEFAULT_TIMEOUT, stale.wait()).await, None);
    assert!(!s.registry.get("local-git").await.unwrap().is_active);
    assert_eq!(s.lifecycle.state("local-git").await, LifecycleState::Inactive);
}

#[tokio::test]
async fn newer_activation_supersedes_older_probe() {
    let s = setup(ScriptedProbe::reachable().gated()).await;
    s.registry.add(user_stdio("local-git", "git")).await.unwrap();

    let first = s.lifecycle.activate("local-git").await.unwrap();
    let second = s.lifecycle.activate("local-git").await.unwrap();
    s.probe.release();
    s.probe.release();

    assert_eq!(with_timeout(DEFAULT_TIMEOUT, first.wait()).await, None);
    assert_eq!(
        with_timeout(DEFAULT_TIMEOUT, second.wait()).await,
        Some(LifecycleState::Active)
    );
    assert_eq!(s.probe.calls(), 2);
}

#[tokio::test]
async fn unknown_server_is_not_found() {
    let s = setup(ScriptedProbe::reachable()).await;

    assert!(matches!(
        s.lifecycle.activate("ghost").await,
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        s.lifecycle.deactivate("ghost").await,
        Err(RegistryError::NotFound(_))
    ));
    assert_eq!(s.probe.calls(), 0);
}
