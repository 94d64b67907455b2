//! Application Services - orchestration with event emission
//!
//! Sits between a front end (the CLI, a UI) and the domain services. The
//! services here combine the sync engine, registry and lifecycle, and
//! publish what happened on the event bus.
//!
//! ```text
//! Front end
//!     │
//!     ▼
//! ┌─────────────────────────────────────┐
//! │ SyncAppService  LifecycleController │──► EventBus
//! └──────────────────┬──────────────────┘
//!                    ▼
//!      SyncEngine · ServerRegistry · ConnectivityProbe
//! ```
//!
//! ```ignore
//! let services = ApplicationServicesBuilder::new()
//!     .with_store(store)
//!     .with_vault(vault)
//!     .build()
//!     .await?;
//! let result = services.sync.sync_and_merge(ProviderKey::ModelScope, None).await?;
//! ```

mod lifecycle;
mod sync;

pub use lifecycle::{LifecycleController, ProbeHandle};
pub use sync::{ImportFailure, ImportReport, SyncAppService, SyncReport};

use std::sync::Arc;

use anyhow::anyhow;

use crate::config::SyncConfig;
use crate::event_bus::{EventBus, EventReceiver};
use crate::provider::ProviderSet;
use crate::repository::{NoopRuntime, ServerRuntime, Store, TokenVault};
use crate::service::{ConnectivityProbe, HttpConnectivityProbe, ServerRegistry, SyncEngine};

/// Builder wiring the application services around shared dependencies
pub struct ApplicationServicesBuilder {
    config: SyncConfig,
    event_bus: Option<Arc<EventBus>>,
    store: Option<Arc<dyn Store>>,
    vault: Option<Arc<dyn TokenVault>>,
    providers: Option<ProviderSet>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    runtime: Option<Arc<dyn ServerRuntime>>,
    activate_new: bool,
}

impl ApplicationServicesBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            event_bus: None,
            store: None,
            vault: None,
            providers: None,
            probe: None,
            runtime: None,
            activate_new: false,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_vault(mut self, vault: Arc<dyn TokenVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    /// Replace the built-in adapters (tests inject fakes here)
    pub fn with_providers(mut self, providers: ProviderSet) -> Self {
        self.providers = Some(providers);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_runtime(mut self, runtime: Arc<dyn ServerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn with_activate_new(mut self, activate: bool) -> Self {
        self.activate_new = activate;
        self
    }

    /// Load the registry and build all services
    pub async fn build(self) -> anyhow::Result<ApplicationServices> {
        let store = self.store.ok_or_else(|| anyhow!("Store required"))?;
        let vault = self.vault.ok_or_else(|| anyhow!("Token vault required"))?;
        let event_bus = self.event_bus.unwrap_or_default();
        let sender = event_bus.sender();

        let providers = match self.providers {
            Some(providers) => providers,
            None => ProviderSet::from_config(&self.config, vault.clone())?,
        };
        let probe: Arc<dyn ConnectivityProbe> = match self.probe {
            Some(probe) => probe,
            None => Arc::new(HttpConnectivityProbe::new(&self.config)?),
        };
        let runtime = self.runtime.unwrap_or_else(|| Arc::new(NoopRuntime));

        let registry = Arc::new(ServerRegistry::load(store).await?.with_events(sender.clone()));
        let lifecycle = Arc::new(
            LifecycleController::new(registry.clone(), probe, runtime, sender.clone())
                .with_probe_timeout(self.config.probe_timeout),
        );
        let engine = Arc::new(SyncEngine::new(providers, vault.clone()));
        let sync = SyncAppService::new(engine, registry.clone(), lifecycle.clone(), sender)
            .with_activate_new(self.activate_new);

        Ok(ApplicationServices {
            event_bus,
            registry,
            lifecycle,
            sync,
            vault,
        })
    }
}

impl Default for ApplicationServicesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Container for the wired services
pub struct ApplicationServices {
    pub event_bus: Arc<EventBus>,
    pub registry: Arc<ServerRegistry>,
    pub lifecycle: Arc<LifecycleController>,
    pub sync: SyncAppService,
    pub vault: Arc<dyn TokenVault>,
}

impl ApplicationServices {
    pub fn subscribe(&self) -> EventReceiver {
        self.event_bus.subscribe()
    }
}
