//! Encrypted token vault over any `Store`.
//!
//! Tokens are sealed with `TokenCipher` and kept under
//! `"<provider>_token"`. Clearing writes an empty value, which reads back
//! as absent.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use mcpreg_core::{ProviderKey, RepoResult, Store, TokenVault};
use tracing::{debug, warn};

use crate::crypto::TokenCipher;

pub struct EncryptedTokenVault {
    store: Arc<dyn Store>,
    cipher: TokenCipher,
}

impl EncryptedTokenVault {
    pub fn new(store: Arc<dyn Store>, cipher: TokenCipher) -> Self {
        Self { store, cipher }
    }
}

#[async_trait]
impl TokenVault for EncryptedTokenVault {
    async fn get(&self, provider: ProviderKey) -> RepoResult<Option<String>> {
        let key = provider.token_key();
        let Some(sealed) = self.store.get(&key).await? else {
            return Ok(None);
        };
        if sealed.is_empty() {
            return Ok(None);
        }

        match self.cipher.open(&key, &sealed) {
            Ok(token) => Ok(Some(token.to_string())),
            Err(e) => {
                // A token sealed under a lost master key is unrecoverable;
                // the user has to enter it again
                warn!(provider = %provider, error = %e, "[Vault] Stored token unreadable");
                Ok(None)
            }
        }
    }

    async fn save(&self, provider: ProviderKey, token: &str) -> RepoResult<()> {
        let key = provider.token_key();
        let sealed = self.cipher.seal(&key, token)?;
        self.store
            .put(&key, &sealed)
            .await
            .with_context(|| format!("Failed to save {} token", provider))?;
        debug!(provider = %provider, "[Vault] Token saved");
        Ok(())
    }

    async fn clear(&self, provider: ProviderKey) -> RepoResult<()> {
        self.store
            .put(&provider.token_key(), "")
            .await
            .with_context(|| format!("Failed to clear {} token", provider))?;
        debug!(provider = %provider, "[Vault] Token cleared");
        Ok(())
    }
}
