//! Shared test utilities and fixtures for McpReg integration tests.

pub use mcpreg_core::{
    DomainEvent, Endpoint, LifecycleState, Origin, ProviderKey, ServerRecord, SyncResult,
    TransportType,
};

/// Mock collaborator implementations
pub mod mocks;
pub use mocks::{MockStore, MockTokenVault, RecordingRuntime, ScriptedProbe};

/// Event testing utilities
pub mod events {
    use mcpreg_core::{DomainEvent, EventReceiver, LifecycleState};
    use std::time::Duration;

    /// Collect events from a receiver until it stays quiet for `timeout`
    pub async fn collect_events(rx: &mut EventReceiver, timeout: Duration) -> Vec<DomainEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(timeout, rx.recv()).await {
            events.push(event);
        }
        events
    }

    /// Wait for a specific event
    pub async fn wait_for_event<F>(
        rx: &mut EventReceiver,
        timeout: Duration,
        predicate: F,
    ) -> Option<DomainEvent>
    where
        F: Fn(&DomainEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(event)) if predicate(&event) => return Some(event),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }

    /// Lifecycle states announced for one server, in order
    pub fn states_for(events: &[DomainEvent], id: &str) -> Vec<LifecycleState> {
        events
            .iter()
            .filter_map(|e| match e {
                DomainEvent::ServerStatusChanged {
                    server_id, state, ..
                } if server_id == id => Some(*state),
                _ => None,
            })
            .collect()
    }
}

/// Record fixtures
pub mod fixtures {
    use super::*;

    /// Discovered ModelScope record at `https://x/<id>/sse`
    pub fn discovered(native_id: &str, name: &str) -> ServerRecord {
        ServerRecord::discovered(
            ProviderKey::ModelScope,
            native_id,
            name,
            TransportType::Sse,
            Endpoint::remote(format!("https://x/{}/sse", native_id)),
        )
    }

    /// User-authored stdio record with a fixed id
    pub fn user_stdio(id: &str, command: &str) -> ServerRecord {
        ServerRecord::new(id, id, TransportType::Stdio, Endpoint::local(command, vec![]))
            .with_origin(Origin::UserCreated)
    }

    /// User-authored remote record with a fixed id
    pub fn user_remote(id: &str, url: &str) -> ServerRecord {
        ServerRecord::new(id, id, TransportType::infer_from_url(url), Endpoint::remote(url))
            .with_origin(Origin::UserCreated)
    }

    /// The ModelScope listing body wrapping `items`
    pub fn modelscope_body(items: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "Code": 200,
            "Success": true,
            "Data": { "Result": items }
        })
    }
}

/// Fully wired services against mocks and a wiremock directory
pub mod harness {
    use std::sync::Arc;
    use std::time::Duration;

    use mcpreg_core::{
        ApplicationServices, ApplicationServicesBuilder, ConnectivityProbe, EventReceiver,
        ProviderKey, SyncConfig,
    };
    use wiremock::MockServer;

    use crate::mocks::{MockStore, MockTokenVault, RecordingRuntime, ScriptedProbe};

    pub struct TestServices {
        pub services: ApplicationServices,
        pub store: Arc<MockStore>,
        pub vault: Arc<MockTokenVault>,
        pub runtime: Arc<RecordingRuntime>,
        pub events: EventReceiver,
    }

    /// Point every provider at the mock server
    pub fn config_for(server: &MockServer) -> SyncConfig {
        ProviderKey::ALL
            .into_iter()
            .fold(SyncConfig::default(), |config, provider| {
                config.with_base_url(provider, server.uri())
            })
            .with_fetch_timeout(Duration::from_secs(5))
            .with_probe_timeout(Duration::from_secs(1))
    }

    pub struct TestServicesBuilder {
        config: SyncConfig,
        store: Arc<MockStore>,
        vault: Arc<MockTokenVault>,
        probe: Arc<dyn ConnectivityProbe>,
        activate_new: bool,
    }

    impl TestServicesBuilder {
        pub fn new(server: &MockServer) -> Self {
            Self {
                config: config_for(server),
                store: Arc::new(MockStore::new()),
                vault: Arc::new(MockTokenVault::new()),
                probe: Arc::new(ScriptedProbe::reachable()),
                activate_new: false,
            }
        }

        pub fn with_store(mut self, store: MockStore) -> Self {
            self.store = Arc::new(store);
            self
        }

        pub fn with_vault(mut self, vault: MockTokenVault) -> Self {
            self.vault = Arc::new(vault);
            self
        }

        pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
            self.probe = probe;
            self
        }

        pub fn with_activate_new(mut self, activate: bool) -> Self {
            self.activate_new = activate;
            self
        }

        pub async fn build(self) -> TestServices {
            let runtime = Arc::new(RecordingRuntime::new());
            let services = ApplicationServicesBuilder::new()
                .with_config(self.config)
                .with_store(self.store.clone())
                .with_vault(self.vault.clone())
                .with_probe(self.probe)
                .with_runtime(runtime.clone())
                .with_activate_new(self.activate_new)
                .build()
                .await
                .expect("Failed to build services");
            let events = services.subscribe();

            TestServices {
                services,
                store: self.store,
                vault: self.vault,
                runtime,
                events,
            }
        }
    }
}

/// Database test helpers
pub mod db {
    use mcpreg_storage::{Database, DATABASE_FILE};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    /// Temporary database file
    pub struct TestDatabase {
        pub db: Database,
        db_path: PathBuf,
        _temp_dir: TempDir,
    }

    impl TestDatabase {
        pub fn new() -> Self {
            let temp_dir = TempDir::new().expect("Failed to create temp dir");
            let db_path = temp_dir.path().join(DATABASE_FILE);
            let db = Database::open(&db_path).expect("Failed to open test database");
            Self {
                db,
                db_path,
                _temp_dir: temp_dir,
            }
        }

        pub fn db_path(&self) -> &Path {
            &self.db_path
        }

        /// Hand the database over, keeping the directory alive
        pub fn into_shared(self) -> (Arc<Mutex<Database>>, TempDir) {
            (Arc::new(Mutex::new(self.db)), self._temp_dir)
        }
    }

    impl Default for TestDatabase {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Async test helpers
pub mod async_helpers {
    use std::time::Duration;
    use tokio::time::timeout;

    /// Run an async operation with a timeout
    pub async fn with_timeout<F, T>(duration: Duration, f: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        timeout(duration, f).await.expect("Operation timed out")
    }

    /// Default test timeout (5 seconds)
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
}
