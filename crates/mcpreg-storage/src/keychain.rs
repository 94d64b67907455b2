//! OS Keychain integration.
//!
//! Uses the platform-native secure storage:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Two uses: the master key for the encrypted vault, and, as an
//! alternative vault, provider tokens stored directly as keychain entries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use keyring::Entry;
use mcpreg_core::{branding, ProviderKey, RepoResult, TokenVault};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{generate_master_key, KEY_SIZE};

const MASTER_KEY_NAME: &str = "master-encryption-key";

/// Source of the vault's master encryption key.
pub trait MasterKeyProvider: Send + Sync {
    /// Get the master key, creating one if it doesn't exist.
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>>;
}

/// Master key kept in the OS keychain, hex encoded.
pub struct KeychainKeyProvider {
    entry: Entry,
}

impl KeychainKeyProvider {
    pub fn new() -> Result<Self> {
        Self::with_names(branding::KEYCHAIN_SERVICE, MASTER_KEY_NAME)
    }

    /// Custom service and key name
    pub fn with_names(service: &str, key_name: &str) -> Result<Self> {
        let entry = Entry::new(service, key_name).context("Failed to create keychain entry")?;
        Ok(Self { entry })
    }
}

impl MasterKeyProvider for KeychainKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        match self.entry.get_password() {
            Ok(hex_key) => {
                debug!("[Keychain] Retrieved existing master key");
                decode_key(&hex_key)
            }
            Err(keyring::Error::NoEntry) => {
                info!("[Keychain] No master key found, generating one");
                let key = generate_master_key()?;
                let hex_key = Zeroizing::new(hex::encode(*key));
                self.entry
                    .set_password(&hex_key)
                    .context("Failed to store master key in keychain")?;
                Ok(key)
            }
            Err(e) => {
                warn!("[Keychain] Keychain error: {:?}", e);
                Err(anyhow::anyhow!("Failed to access keychain: {}", e))
            }
        }
    }
}

/// Master key supplied by the caller, e.g. from `MCPREG_MASTER_KEY` on
/// machines without a keychain daemon.
pub struct StaticKeyProvider {
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl StaticKeyProvider {
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        Ok(Self {
            key: decode_key(hex_key.trim())?,
        })
    }
}

impl MasterKeyProvider for StaticKeyProvider {
    fn get_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        Ok(self.key.clone())
    }
}

fn decode_key(hex_key: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let bytes = Zeroizing::new(hex::decode(hex_key).context("Invalid master key encoding")?);
    if bytes.len() != KEY_SIZE {
        anyhow::bail!(
            "Invalid master key size: expected {}, got {}",
            KEY_SIZE,
            bytes.len()
        );
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Provider tokens stored one keychain entry each, under
/// `ProviderKey::token_key()`.
pub struct KeychainTokenVault {
    service: String,
}

impl KeychainTokenVault {
    pub fn new() -> Self {
        Self::with_service(branding::KEYCHAIN_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, provider: ProviderKey) -> Result<Entry> {
        Entry::new(&self.service, &provider.token_key())
            .with_context(|| format!("Failed to create keychain entry for {}", provider))
    }
}

impl Default for KeychainTokenVault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVault for KeychainTokenVault {
    async fn get(&self, provider: ProviderKey) -> RepoResult<Option<String>> {
        match self.entry(provider)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to read {} token: {}", provider, e)),
        }
    }

    async fn save(&self, provider: ProviderKey, token: &str) -> RepoResult<()> {
        self.entry(provider)?
            .set_password(token)
            .with_context(|| format!("Failed to store {} token in keychain", provider))?;
        debug!(provider = %provider, "[Keychain] Token saved");
        Ok(())
    }

    async fn clear(&self, provider: ProviderKey) -> RepoResult<()> {
        match self.entry(provider)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to clear {} token: {}", provider, e)),
        }
    }
}
