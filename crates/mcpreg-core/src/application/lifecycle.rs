//! Lifecycle Controller
//!
//! Drives `Inactive → Probing → {Active, Inactive}` per server.
//!
//! Probes run on spawned tasks. Every activation and deactivation stamps the
//! server with a fresh generation drawn from one controller-wide counter, so
//! a number is never reused even after a server is removed and added again.
//! A probe result is applied only if its generation is still current and
//! the server still exists. A user who
//! toggles a server off mid-probe, or deletes it, never sees the late
//! result resurrect it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_PROBE_TIMEOUT;
use crate::domain::{DomainEvent, LifecycleState, ServerRecord};
use crate::error::RegistryError;
use crate::event_bus::EventSender;
use crate::repository::ServerRuntime;
use crate::service::{ConnectivityProbe, ProbeVerdict, ServerRegistry};

#[derive(Debug, Clone, Copy)]
struct Tracked {
    state: LifecycleState,
    generation: u64,
}

/// Handle to a probe in flight.
///
/// Dropping it does not cancel the probe.
#[derive(Debug)]
pub struct ProbeHandle {
    server_id: String,
    task: JoinHandle<Option<LifecycleState>>,
}

impl ProbeHandle {
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Wait for the probe. `None` if its result was discarded.
    pub async fn wait(self) -> Option<LifecycleState> {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                warn!(server_id = %self.server_id, error = %e, "[Lifecycle] Probe task failed");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct LifecycleController {
    registry: Arc<ServerRegistry>,
    probe: Arc<dyn ConnectivityProbe>,
    runtime: Arc<dyn ServerRuntime>,
    event_sender: EventSender,
    probe_timeout: Duration,
    tracked: Arc<Mutex<HashMap<String, Tracked>>>,
    generations: Arc<AtomicU64>,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<ServerRegistry>,
        probe: Arc<dyn ConnectivityProbe>,
        runtime: Arc<dyn ServerRuntime>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            registry,
            probe,
            runtime,
            event_sender,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            tracked: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Current state. Servers never touched this session report
    /// `Active` if they were persisted as active.
    pub async fn state(&self, server_id: &str) -> LifecycleState {
        if let Some(tracked) = self.tracked.lock().await.get(server_id) {
            return tracked.state;
        }
        match self.registry.get(server_id).await {
            Some(record) if record.is_active => LifecycleState::Active,
            _ => LifecycleState::Inactive,
        }
    }

    /// Start probing a server. Returns immediately; the probe runs on its
    /// own task.
    ///
    /// Emits: `ServerStatusChanged(Probing)`, then `Active` or `Inactive`
    pub async fn activate(&self, server_id: &str) -> Result<ProbeHandle, RegistryError> {
        let record = self
            .registry
            .get(server_id)
            .await
            .ok_or_else(|| RegistryError::NotFound(server_id.to_string()))?;

        let generation = self.advance(server_id, LifecycleState::Probing).await;
        info!(server_id = %server_id, generation, "[Lifecycle] Probing server");
        self.emit_state(server_id, LifecycleState::Probing, true, None);

        let controller = self.clone();
        let task = tokio::spawn(async move {
            let verdict = controller
                .probe
                .probe(&record, controller.probe_timeout)
                .await;
            controller.finish_probe(&record, generation, verdict).await
        });

        Ok(ProbeHandle {
            server_id: server_id.to_string(),
            task,
        })
    }

    /// Turn a server off. Any probe in flight is discarded; a running
    /// server is stopped through the runtime.
    ///
    /// Emits: `ServerStatusChanged(Inactive)`
    pub async fn deactivate(&self, server_id: &str) -> Result<(), RegistryError> {
        let mut tracked = self.tracked.lock().await;
        let record = self
            .registry
            .get(server_id)
            .await
            .ok_or_else(|| RegistryError::NotFound(server_id.to_string()))?;

        let previous = tracked.get(server_id).map(|t| t.state);
        self.bump(&mut tracked, server_id, LifecycleState::Inactive);

        if previous == Some(LifecycleState::Active) || record.is_active {
            self.stop_runtime(&record).await;
        }
        if record.is_active {
            self.registry.set_active(server_id, false).await?;
        }
        drop(tracked);

        info!(server_id = %server_id, "[Lifecycle] Deactivated server");
        self.emit_state(server_id, LifecycleState::Inactive, true, None);
        Ok(())
    }

    /// Delete a server, stopping it first if it is running. A probe in
    /// flight for it is discarded.
    pub async fn remove(&self, server_id: &str) -> Result<ServerRecord, RegistryError> {
        let mut tracked = self.tracked.lock().await;
        let record = self
            .registry
            .get(server_id)
            .await
            .ok_or_else(|| RegistryError::NotFound(server_id.to_string()))?;

        let previous = tracked.get(server_id).map(|t| t.state);
        if previous == Some(LifecycleState::Active) || record.is_active {
            self.stop_runtime(&record).await;
        }

        let removed = self.registry.remove(server_id).await?;
        tracked.remove(server_id);
        Ok(removed)
    }

    async fn finish_probe(
        &self,
        record: &ServerRecord,
        generation: u64,
        verdict: ProbeVerdict,
    ) -> Option<LifecycleState> {
        let server_id = record.id.as_str();
        let mut tracked = self.tracked.lock().await;

        let current = tracked.get(server_id).map(|t| t.generation);
        if current != Some(generation) {
            debug!(server_id = %server_id, generation, "[Lifecycle] Discarding stale probe result");
            return None;
        }
        if !self.registry.contains(server_id).await {
            debug!(server_id = %server_id, "[Lifecycle] Server removed while probing");
            tracked.remove(server_id);
            return None;
        }

        let (state, notify_user, detail) = if verdict.reachable {
            match self.registry.set_active(server_id, true).await {
                Ok(_) => {
                    info!(server_id = %server_id, "[Lifecycle] Server is reachable, now active");
                    (LifecycleState::Active, true, None)
                }
                Err(e) => {
                    warn!(server_id = %server_id, error = %e, "[Lifecycle] Failed to record activation");
                    (LifecycleState::Inactive, true, Some(e.to_string()))
                }
            }
        } else {
            let quiet = record.suppresses_probe_alarm();
            if quiet {
                info!(
                    server_id = %server_id,
                    detail = ?verdict.detail,
                    "[Lifecycle] Probe failed for a server that may need setup"
                );
            } else {
                warn!(server_id = %server_id, detail = ?verdict.detail, "[Lifecycle] Server unreachable");
            }
            if let Err(e) = self.registry.set_active(server_id, false).await {
                warn!(server_id = %server_id, error = %e, "[Lifecycle] Failed to record deactivation");
            }
            (LifecycleState::Inactive, !quiet, verdict.detail)
        };

        if let Some(entry) = tracked.get_mut(server_id) {
            entry.state = state;
        }
        drop(tracked);

        self.emit_state(server_id, state, notify_user, detail);
        Some(state)
    }

    async fn advance(&self, server_id: &str, state: LifecycleState) -> u64 {
        let mut tracked = self.tracked.lock().await;
        self.bump(&mut tracked, server_id, state)
    }

    fn bump(
        &self,
        tracked: &mut HashMap<String, Tracked>,
        server_id: &str,
        state: LifecycleState,
    ) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        tracked.insert(server_id.to_string(), Tracked { state, generation });
        generation
    }

    async fn stop_runtime(&self, record: &ServerRecord) {
        if let Err(e) = self.runtime.stop(record).await {
            warn!(server_id = %record.id, error = %e, "[Lifecycle] Runtime failed to stop server");
        }
    }

    fn emit_state(
        &self,
        server_id: &str,
        state: LifecycleState,
        notify_user: bool,
        detail: Option<String>,
    ) {
        self.event_sender.emit(DomainEvent::ServerStatusChanged {
            server_id: server_id.to_string(),
            state,
            notify_user,
            detail,
        });
    }
}
