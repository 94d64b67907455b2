//! Provider directory adapters
//!
//! One adapter per external directory. Each knows how to fetch its
//! provider's listing and how to map that provider's field names onto
//! `ServerRecord`. The sync engine only ever talks to the
//! `ProviderAdapter` trait.
//!
//! ```text
//! fetch(token) ──► RawListing { items } ──► normalize() ──► Vec<ServerRecord>
//!     │
//!     ├─ 401/403 ──► vault.clear() + Unauthorized
//!     └─ 5xx/network ──► Transient
//! ```

mod bailian;
mod http;
mod lanyun;
mod modelscope;
mod router;
mod tokenflux;

pub use bailian::BailianAdapter;
pub use http::{build_client, ProviderHttp};
pub use lanyun::LanYunAdapter;
pub use modelscope::ModelScopeAdapter;
pub use router::RouterAdapter;
pub use tokenflux::TokenFluxAdapter;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::SyncConfig;
use crate::domain::{ProviderKey, ServerRecord};
use crate::error::ProviderError;
use crate::repository::TokenVault;

/// Items of one provider listing, envelope already unwrapped.
pub struct RawListing {
    pub provider: ProviderKey,
    pub items: Vec<Value>,
    /// Token the listing was fetched with; some providers require it as a
    /// header on every server they publish.
    token: Zeroizing<String>,
}

impl RawListing {
    pub fn new(provider: ProviderKey, items: Vec<Value>, token: &str) -> Self {
        Self {
            provider,
            items,
            token: Zeroizing::new(token.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// `Authorization` header value for servers that need the provider token
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.as_str())
    }
}

impl std::fmt::Debug for RawListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawListing")
            .field("provider", &self.provider)
            .field("items", &self.items.len())
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Strategy for one provider directory.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn key(&self) -> ProviderKey;

    /// Fetch the raw listing. Empty tokens are rejected without a request.
    async fn fetch(&self, token: &str) -> Result<RawListing, ProviderError>;

    /// Map the listing onto canonical records.
    ///
    /// Items that fail to parse or lack transport info are dropped.
    fn normalize(&self, listing: &RawListing) -> Vec<ServerRecord>;
}

/// The adapters available to the sync engine, keyed by provider.
#[derive(Clone, Default)]
pub struct ProviderSet {
    adapters: BTreeMap<ProviderKey, Arc<dyn ProviderAdapter>>,
}

impl ProviderSet {
    /// Empty set; add adapters with `with_adapter`
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in provider, sharing one HTTP client.
    pub fn from_config(config: &SyncConfig, vault: Arc<dyn TokenVault>) -> anyhow::Result<Self> {
        let client = build_client(config)?;
        let http = |provider| ProviderHttp::new(provider, client.clone(), vault.clone());

        Ok(Self::new()
            .with_adapter(Arc::new(ModelScopeAdapter::new(
                http(ProviderKey::ModelScope),
                config.base_url(ProviderKey::ModelScope),
            )))
            .with_adapter(Arc::new(TokenFluxAdapter::new(
                http(ProviderKey::TokenFlux),
                config.base_url(ProviderKey::TokenFlux),
            )))
            .with_adapter(Arc::new(LanYunAdapter::new(
                http(ProviderKey::LanYun),
                config.base_url(ProviderKey::LanYun),
            )))
            .with_adapter(Arc::new(RouterAdapter::mcprouter(
                http(ProviderKey::McpRouter),
                config.base_url(ProviderKey::McpRouter),
            )))
            .with_adapter(Arc::new(RouterAdapter::ai302(
                http(ProviderKey::Ai302),
                config.base_url(ProviderKey::Ai302),
            )))
            .with_adapter(Arc::new(BailianAdapter::new(
                http(ProviderKey::Bailian),
                config.base_url(ProviderKey::Bailian),
            ))))
    }

    /// Register (or replace) the adapter for its provider
    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.key(), adapter);
        self
    }

    pub fn get(&self, provider: ProviderKey) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    pub fn keys(&self) -> Vec<ProviderKey> {
        self.adapters.keys().copied().collect()
    }
}

// ============================================
// Normalization helpers
// ============================================

/// Deserialize each item as `T` and map it, dropping what does not fit.
pub(crate) fn normalize_items<T, F>(listing: &RawListing, map: F) -> Vec<ServerRecord>
where
    T: DeserializeOwned,
    F: Fn(T) -> Option<ServerRecord>,
{
    let mut records = Vec::with_capacity(listing.items.len());

    for (index, item) in listing.items.iter().enumerate() {
        match serde_json::from_value::<T>(item.clone()) {
            Ok(parsed) => match map(parsed) {
                Some(record) => records.push(record),
                None => debug!(
                    provider = %listing.provider,
                    index,
                    "[Provider] Skipping item without id or usable endpoint"
                ),
            },
            Err(e) => warn!(
                provider = %listing.provider,
                index,
                error = %e,
                "[Provider] Skipping malformed item"
            ),
        }
    }

    records
}

/// First value that is present and not blank, trimmed.
pub(crate) fn first_non_blank<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Providers send ids as strings or numbers.
pub(crate) fn native_id(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Treat `null` the same as a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Follow `path` into the envelope and take the array found there.
pub(crate) fn array_at(body: &Value, path: &[&str]) -> Option<Vec<Value>> {
    let mut current = body;
    for segment in path {
        current = current.get(segment)?;
    }
    current.as_array().cloned()
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
