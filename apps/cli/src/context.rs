//! Wiring: storage, token vault and application services.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::ValueEnum;
use mcpreg_core::{ApplicationServices, ApplicationServicesBuilder, SyncConfig, TokenVault};
use mcpreg_storage::{
    default_database_path, Database, EncryptedTokenVault, KeychainKeyProvider, KeychainTokenVault, MasterKeyProvider,
    SqliteStore, StaticKeyProvider, TokenCipher,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Hex master key for the encrypted vault, for hosts without a keychain
pub const MASTER_KEY_ENV: &str = "MCPREG_MASTER_KEY";

/// Where provider tokens are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenStore {
    /// Encrypted in the database; master key from the keychain or MCPREG_MASTER_KEY
    Encrypted,
    /// One OS keychain entry per provider
    Keychain,
}

pub struct Context {
    pub services: ApplicationServices,
}

impl Context {
    pub async fn open(
        db_path: Option<PathBuf>,
        token_store: TokenStore,
        activate_new: bool,
    ) -> Result<Self> {
        let db_path = db_path
            .or_else(default_database_path)
            .context("No data directory; pass --db")?;
        debug!("[CLI] Using database {:?}", db_path);

        let db = Database::open(&db_path)?;
        let store = Arc::new(SqliteStore::new(Arc::new(Mutex::new(db))));

        let vault: Arc<dyn TokenVault> = match token_store {
            TokenStore::Encrypted => {
                let key = master_key_provider()?
                    .get_or_create_key()
                    .context("Failed to obtain the vault master key")?;
                Arc::new(EncryptedTokenVault::new(store.clone(), TokenCipher::new(&key)?))
            }
            TokenStore::Keychain => Arc::new(KeychainTokenVault::new()),
        };

        let services = ApplicationServicesBuilder::new()
            .with_config(SyncConfig::from_env())
            .with_store(store)
            .with_vault(vault)
            .with_activate_new(activate_new)
            .build()
            .await?;

        Ok(Self { services })
    }
}

fn master_key_provider() -> Result<Box<dyn MasterKeyProvider>> {
    match std::env::var(MASTER_KEY_ENV) {
        Ok(hex_key) if !hex_key.trim().is_empty() => {
            let provider = StaticKeyProvider::from_hex(&hex_key)
                .with_context(|| format!("{} is not a valid key", MASTER_KEY_ENV))?;
            Ok(Box::new(provider))
        }
        _ => Ok(Box::new(KeychainKeyProvider::new()?)),
    }
}
