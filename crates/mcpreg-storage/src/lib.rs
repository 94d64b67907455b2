//! McpReg Storage Layer
//!
//! Persistence for the registry and provider tokens.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │   mcpreg-core traits: Store, TokenVault      │
//! ├──────────────────────┬───────────────────────┤
//! │ SqliteStore          │ EncryptedTokenVault   │
//! │ (kv_store table)     │ (AES-256-GCM → Store) │
//! │                      ├───────────────────────┤
//! │                      │ KeychainTokenVault    │
//! ├──────────────────────┴───────────────────────┤
//! │ Database (SQLite)   MasterKeyProvider        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ```rust,ignore
//! let db = Arc::new(Mutex::new(Database::open(&path)?));
//! let store = Arc::new(SqliteStore::new(db));
//! let key = KeychainKeyProvider::new()?.get_or_create_key()?;
//! let vault = EncryptedTokenVault::new(store.clone(), TokenCipher::new(&key)?);
//! ```

pub mod crypto;
mod database;
pub mod keychain;
mod sqlite_store;
mod vault;

pub use crypto::{generate_master_key, TokenCipher, KEY_SIZE};
pub use database::Database;
pub use keychain::{KeychainKeyProvider, KeychainTokenVault, MasterKeyProvider, StaticKeyProvider};
pub use sqlite_store::SqliteStore;
pub use vault::EncryptedTokenVault;

/// Default database file name.
pub const DATABASE_FILE: &str = "mcpreg.db";

/// Default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| {
        p.join(mcpreg_core::branding::SHORT_NAME)
            .join(DATABASE_FILE)
    })
}
