//! Sync Application Service
//!
//! Runs provider syncs against the live registry, commits the results and
//! announces them. Also the entry point for bulk import/export, since both
//! feed the same registry and lifecycle.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::lifecycle::{LifecycleController, ProbeHandle};
use crate::domain::{DomainEvent, ProviderKey, SyncErrorKind, SyncResult};
use crate::error::{ImportError, RegistryError};
use crate::event_bus::EventSender;
use crate::service::{bulk_config, ServerRegistry, SyncEngine};

/// Why one import entry was not inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of `import_json`
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<String>,
    pub failed: Vec<ImportFailure>,
    /// Probes started for entries that asked to be active
    pub probes: Vec<ProbeHandle>,
}

/// Outcome of a committed provider sync
#[derive(Debug)]
pub struct SyncReport {
    pub result: SyncResult,
    /// Probes started for newly added servers when activation is on
    pub probes: Vec<ProbeHandle>,
}

impl SyncReport {
    fn without_probes(result: SyncResult) -> Self {
        Self {
            result,
            probes: Vec::new(),
        }
    }
}

pub struct SyncAppService {
    engine: Arc<SyncEngine>,
    registry: Arc<ServerRegistry>,
    lifecycle: Arc<LifecycleController>,
    event_sender: EventSender,
    activate_new: bool,
}

impl SyncAppService {
    pub fn new(
        engine: Arc<SyncEngine>,
        registry: Arc<ServerRegistry>,
        lifecycle: Arc<LifecycleController>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            engine,
            registry,
            lifecycle,
            event_sender,
            activate_new: false,
        }
    }

    /// Probe every newly discovered server right after it is merged
    pub fn with_activate_new(mut self, activate: bool) -> Self {
        self.activate_new = activate;
        self
    }

    pub fn providers(&self) -> Vec<ProviderKey> {
        self.engine.providers().keys()
    }

    /// Compute what a sync would change, without committing it.
    pub async fn preview(&self, provider: ProviderKey, token: Option<&str>) -> SyncResult {
        let snapshot = self.registry.list().await;
        self.engine.sync(provider, token, &snapshot).await
    }

    /// Sync one provider and commit the result. Probes started for new
    /// servers keep running in the background.
    pub async fn sync_and_merge(
        &self,
        provider: ProviderKey,
        token: Option<&str>,
    ) -> Result<SyncResult, RegistryError> {
        Ok(self.sync_with_probes(provider, token).await?.result)
    }

    /// Sync one provider, commit the result and hand back the probes
    /// started for newly added servers.
    ///
    /// Emits: `ProviderSynced` on success, `ProviderTokenCleared` when the
    /// provider rejected its token
    pub async fn sync_with_probes(
        &self,
        provider: ProviderKey,
        token: Option<&str>,
    ) -> Result<SyncReport, RegistryError> {
        let result = self.preview(provider, token).await;

        if !result.success {
            if result.token_cleared {
                self.event_sender
                    .emit(DomainEvent::ProviderTokenCleared { provider });
            }
            return Ok(SyncReport::without_probes(result));
        }

        let outcome = self.registry.merge(&result).await?;

        info!(
            provider = %provider,
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            "[SyncAppService] {}",
            result.message
        );
        self.event_sender.emit(DomainEvent::ProviderSynced {
            provider,
            added: outcome.added.len(),
            updated: outcome.updated.len(),
        });

        let mut report = SyncReport::without_probes(result);
        if self.activate_new {
            for server_id in &outcome.added {
                match self.lifecycle.activate(server_id).await {
                    Ok(handle) => report.probes.push(handle),
                    Err(e) => {
                        warn!(server_id = %server_id, error = %e, "[SyncAppService] Failed to start probe")
                    }
                }
            }
        }

        Ok(report)
    }

    /// Sync every provider concurrently with the vault's tokens.
    ///
    /// Each provider works from its own snapshot; commits are serialized by
    /// the registry. A commit failure is reported as a failed result.
    pub async fn sync_all(&self) -> Vec<SyncResult> {
        self.sync_all_with_probes()
            .await
            .into_iter()
            .map(|report| report.result)
            .collect()
    }

    /// `sync_all`, keeping the probes started for new servers
    pub async fn sync_all_with_probes(&self) -> Vec<SyncReport> {
        let syncs = self.providers().into_iter().map(|provider| async move {
            match self.sync_with_probes(provider, None).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(provider = %provider, error = %e, "[SyncAppService] Failed to commit sync");
                    SyncReport::without_probes(SyncResult::failed(
                        provider,
                        SyncErrorKind::Transient,
                        Some(e.to_string()),
                    ))
                }
            }
        });

        join_all(syncs).await
    }

    /// Import an `mcpServers` document.
    ///
    /// The document is validated as a whole; entries whose id already
    /// exists are reported individually while the rest are inserted.
    pub async fn import_json(&self, text: &str) -> Result<ImportReport, ImportError> {
        let parsed = bulk_config::parse_import(text)?;
        let mut report = ImportReport::default();

        for record in parsed.records {
            let id = record.id.clone();
            match self.registry.add(record).await {
                Ok(()) => report.imported.push(id),
                Err(e) => {
                    warn!(server_id = %id, error = %e, "[SyncAppService] Import entry rejected");
                    report.failed.push(ImportFailure {
                        id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for id in parsed.activate {
            if !report.imported.contains(&id) {
                continue;
            }
            match self.lifecycle.activate(&id).await {
                Ok(handle) => report.probes.push(handle),
                Err(e) => warn!(server_id = %id, error = %e, "[SyncAppService] Failed to start probe"),
            }
        }

        info!(
            imported = report.imported.len(),
            failed = report.failed.len(),
            "[SyncAppService] Import finished"
        );
        Ok(report)
    }

    /// Export the whole registry as an `mcpServers` document
    pub async fn export_json(&self) -> Result<String, serde_json::Error> {
        bulk_config::export_json(&self.registry.list().await)
    }
}
