//! Collaborator traits for storage and credentials
//!
//! These traits define the interface the core reads and writes through
//! without specifying the implementation (SQLite, keychain, in-memory, etc.)

use async_trait::async_trait;

use crate::domain::{ProviderKey, ServerRecord};

/// Result type for collaborator operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Key-value persistence used by the registry.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> RepoResult<Option<String>>;

    /// Set a value, replacing any previous one
    async fn put(&self, key: &str, value: &str) -> RepoResult<()>;
}

/// Per-provider credential storage.
///
/// Entries are keyed by `ProviderKey::token_key()` (`"<provider>_token"`).
#[async_trait]
pub trait TokenVault: Send + Sync {
    /// Get the stored token, `None` if absent
    async fn get(&self, provider: ProviderKey) -> RepoResult<Option<String>>;

    /// Save (or overwrite) the token
    async fn save(&self, provider: ProviderKey, token: &str) -> RepoResult<()>;

    /// Forget the token. Clearing an absent token is not an error.
    async fn clear(&self, provider: ProviderKey) -> RepoResult<()>;
}

/// External runtime that actually runs server processes/connections.
#[async_trait]
pub trait ServerRuntime: Send + Sync {
    /// Stop whatever is running for this server
    async fn stop(&self, record: &ServerRecord) -> RepoResult<()>;
}

/// Runtime that has nothing to stop; used when no process manager is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRuntime;

#[async_trait]
impl ServerRuntime for NoopRuntime {
    async fn stop(&self, record: &ServerRecord) -> RepoResult<()> {
        tracing::debug!(server_id = %record.id, "[Runtime] Nothing to stop");
        Ok(())
    }
}
