//! Mock collaborator implementations for testing
//!
//! In-memory implementations of the core's collaborator traits for fast,
//! isolated tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use tokio::sync::Semaphore;

use mcpreg_core::{
    ConnectivityProbe, ProbeVerdict, ProviderKey, RepoResult, ServerRecord, ServerRuntime, Store,
    TokenVault,
};

// ============================================================================
// MockStore
// ============================================================================

/// Key-value store whose writes can be made to fail on demand.
#[derive(Default)]
pub struct MockStore {
    values: RwLock<HashMap<String, String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.read().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// MockTokenVault
// ============================================================================

#[derive(Default)]
pub struct MockTokenVault {
    tokens: RwLock<HashMap<ProviderKey, String>>,
    clears: AtomicUsize,
}

impl MockTokenVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, provider: ProviderKey, token: &str) -> Self {
        self.tokens
            .write()
            .unwrap()
            .insert(provider, token.to_string());
        self
    }

    pub fn token(&self, provider: ProviderKey) -> Option<String> {
        self.tokens.read().unwrap().get(&provider).cloned()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVault for MockTokenVault {
    async fn get(&self, provider: ProviderKey) -> RepoResult<Option<String>> {
        Ok(self.token(provider))
    }

    async fn save(&self, provider: ProviderKey, token: &str) -> RepoResult<()> {
        self.tokens
            .write()
            .unwrap()
            .insert(provider, token.to_string());
        Ok(())
    }

    async fn clear(&self, provider: ProviderKey) -> RepoResult<()> {
        self.tokens.write().unwrap().remove(&provider);
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// RecordingRuntime
// ============================================================================

/// Runtime that remembers which servers it was asked to stop.
#[derive(Default)]
pub struct RecordingRuntime {
    stopped: StdMutex<Vec<String>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerRuntime for RecordingRuntime {
    async fn stop(&self, record: &ServerRecord) -> RepoResult<()> {
        self.stopped.lock().unwrap().push(record.id.clone());
        Ok(())
    }
}

// ============================================================================
// ScriptedProbe
// ============================================================================

/// Probe with a fixed verdict. When gated, each probe waits for one
/// `release`.
pub struct ScriptedProbe {
    verdict: ProbeVerdict,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn reachable() -> Self {
        Self::with_verdict(ProbeVerdict::reachable())
    }

    pub fn unreachable(detail: &str) -> Self {
        Self::with_verdict(ProbeVerdict::unreachable(detail))
    }

    fn with_verdict(verdict: ProbeVerdict) -> Self {
        Self {
            verdict,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Hold every probe until `release`
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let one waiting (or the next) probe finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for ScriptedProbe {
    async fn probe(&self, _record: &ServerRecord, _timeout: Duration) -> ProbeVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.verdict.clone()
    }
}
