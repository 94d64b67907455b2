//! Outcome of one provider sync

use serde::{Deserialize, Serialize};

use super::{ProviderKey, ServerRecord};

/// Message reported when a provider answered but had nothing usable.
pub const NO_SERVERS_MESSAGE: &str = "no servers available";
/// Message reported when the provider rejected (or we lacked) a token.
pub const UNAUTHORIZED_MESSAGE: &str = "sync unauthorized";
/// Message reported for retryable upstream failures.
pub const SYNC_ERROR_MESSAGE: &str = "sync error";

/// Why a sync failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// Credential missing, invalid or expired; the user must re-enter it
    Unauthorized,
    /// Upstream or network failure; safe to retry
    Transient,
}

/// Result of a single `SyncEngine::sync` call.
///
/// `added` and `updated` are disjoint. Records that vanished upstream are
/// never reported; sync does not delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub provider: ProviderKey,
    pub success: bool,
    pub message: String,
    pub added: Vec<ServerRecord>,
    pub updated: Vec<ServerRecord>,
    /// Upstream items dropped during normalization or identity resolution
    #[serde(default)]
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<SyncErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    /// The provider rejected the token and it was dropped from the vault
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub token_cleared: bool,
}

impl SyncResult {
    /// Successful sync. The message reflects how many records were touched.
    pub fn succeeded(
        provider: ProviderKey,
        added: Vec<ServerRecord>,
        updated: Vec<ServerRecord>,
        skipped: usize,
    ) -> Self {
        let total = added.len() + updated.len();
        let message = if total == 0 {
            NO_SERVERS_MESSAGE.to_string()
        } else {
            format!(
                "synced {} servers from {} ({} new, {} updated)",
                total,
                provider.display_name(),
                added.len(),
                updated.len()
            )
        };

        Self {
            provider,
            success: true,
            message,
            added,
            updated,
            skipped,
            error_kind: None,
            error_detail: None,
            token_cleared: false,
        }
    }

    /// Failed sync; no records are reported.
    pub fn failed(provider: ProviderKey, kind: SyncErrorKind, detail: Option<String>) -> Self {
        let message = match kind {
            SyncErrorKind::Unauthorized => UNAUTHORIZED_MESSAGE,
            SyncErrorKind::Transient => SYNC_ERROR_MESSAGE,
        };

        Self {
            provider,
            success: false,
            message: message.to_string(),
            added: Vec::new(),
            updated: Vec::new(),
            skipped: 0,
            error_kind: Some(kind),
            error_detail: detail,
            token_cleared: false,
        }
    }

    /// Number of records the caller would commit
    pub fn total(&self) -> usize {
        self.added.len() + self.updated.len()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.error_kind == Some(SyncErrorKind::Unauthorized)
    }
}
