//! Sync engine: fetch, normalize and resolve one provider listing.
//!
//! The engine never mutates the registry. Callers hand it a snapshot and
//! decide whether to merge the result, so a sync doubles as a preview.

use std::sync::Arc;

use tracing::{info, warn};
use zeroize::Zeroizing;

use super::identity::IdentityResolver;
use crate::domain::{ProviderKey, ServerRecord, SyncErrorKind, SyncResult};
use crate::error::ProviderError;
use crate::provider::ProviderSet;
use crate::repository::TokenVault;

pub struct SyncEngine {
    providers: ProviderSet,
    vault: Arc<dyn TokenVault>,
}

impl SyncEngine {
    pub fn new(providers: ProviderSet, vault: Arc<dyn TokenVault>) -> Self {
        Self { providers, vault }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Sync `provider` against `existing`.
    ///
    /// A non-empty `token` is saved to the vault first; otherwise the
    /// vault's token is used. With neither, the result is unauthorized and
    /// nothing is sent.
    pub async fn sync(
        &self,
        provider: ProviderKey,
        token: Option<&str>,
        existing: &[ServerRecord],
    ) -> SyncResult {
        let Some(adapter) = self.providers.get(provider) else {
            warn!(provider = %provider, "[SyncEngine] No adapter registered");
            return SyncResult::failed(
                provider,
                SyncErrorKind::Transient,
                Some("provider not configured".to_string()),
            );
        };

        let token = match self.resolve_token(provider, token).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!(provider = %provider, "[SyncEngine] No token available, skipping fetch");
                let err = ProviderError::MissingToken { provider };
                return SyncResult::failed(provider, err.kind(), Some(err.detail()));
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "[SyncEngine] Token vault unavailable");
                return SyncResult::failed(
                    provider,
                    SyncErrorKind::Transient,
                    Some(format!("token vault unavailable: {}", e)),
                );
            }
        };

        let listing = match adapter.fetch(&token).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(provider = %provider, error = %e, "[SyncEngine] Fetch failed");
                let mut result = SyncResult::failed(provider, e.kind(), Some(e.detail()));
                result.token_cleared = matches!(e, ProviderError::Unauthorized { .. });
                return result;
            }
        };

        let normalized = adapter.normalize(&listing);
        let dropped = listing.items.len().saturating_sub(normalized.len());
        let resolution = IdentityResolver::resolve(normalized, existing);

        info!(
            provider = %provider,
            upstream = listing.items.len(),
            added = resolution.added.len(),
            updated = resolution.updated.len(),
            skipped = dropped + resolution.skipped,
            "[SyncEngine] Sync resolved"
        );

        SyncResult::succeeded(
            provider,
            resolution.added,
            resolution.updated,
            dropped + resolution.skipped,
        )
    }

    async fn resolve_token(
        &self,
        provider: ProviderKey,
        supplied: Option<&str>,
    ) -> anyhow::Result<Option<Zeroizing<String>>> {
        if let Some(token) = supplied.map(str::trim).filter(|t| !t.is_empty()) {
            if let Err(e) = self.vault.save(provider, token).await {
                // The fetch can still go ahead with the supplied token
                warn!(provider = %provider, error = %e, "[SyncEngine] Failed to save token");
            }
            return Ok(Some(Zeroizing::new(token.to_string())));
        }

        let stored = self.vault.get(provider).await?;
        Ok(stored
            .filter(|t| !t.trim().is_empty())
            .map(Zeroizing::new))
    }
}
