//! Error types for registry synchronization.
//!
//! Adapter failures are classified so callers can tell a dead credential
//! from a flaky upstream. Collaborator traits (`Store`, `TokenVault`)
//! keep returning `anyhow::Result`; these enums wrap them where a caller
//! needs to match.

use thiserror::Error;

use crate::domain::{ProviderKey, SyncErrorKind};

/// Failure while fetching a provider listing.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No token was available; nothing was sent.
    #[error("{provider} token is missing")]
    MissingToken { provider: ProviderKey },

    /// Provider answered 401/403. The vault entry has already been cleared.
    #[error("{provider} rejected the token (HTTP {status})")]
    Unauthorized { provider: ProviderKey, status: u16 },

    /// Network failure, timeout, 5xx, or an unusable response body.
    #[error("{provider} request failed: {detail}")]
    Transient {
        provider: ProviderKey,
        status: Option<u16>,
        detail: String,
    },
}

impl ProviderError {
    pub fn transient(provider: ProviderKey, detail: impl Into<String>) -> Self {
        Self::Transient {
            provider,
            status: None,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::MissingToken { .. } | Self::Unauthorized { .. } => SyncErrorKind::Unauthorized,
            Self::Transient { .. } => SyncErrorKind::Transient,
        }
    }

    /// Raw detail surfaced in `SyncResult::error_detail`
    pub fn detail(&self) -> String {
        match self {
            Self::MissingToken { .. } => "no token configured".to_string(),
            Self::Unauthorized { status, .. } => format!("HTTP {}", status),
            Self::Transient {
                status: Some(status),
                detail,
                ..
            } => format!("HTTP {}: {}", status, detail),
            Self::Transient { detail, .. } => detail.clone(),
        }
    }
}

/// Registry mutation failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `add` was called with an id that already exists; use `replace`.
    #[error("server id already exists: {0}")]
    DuplicateId(String),

    #[error("server not found: {0}")]
    NotFound(String),

    /// The backing store rejected the write. In-memory state is unchanged.
    #[error("failed to persist registry: {0}")]
    Persistence(#[source] anyhow::Error),

    /// The persisted registry could not be decoded.
    #[error("persisted registry is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Bulk import failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    /// Malformed JSON or an entry that cannot become a server.
    ///
    /// The message is a formatted diagnostic meant for display.
    #[error("invalid MCP server configuration: {diagnostic}")]
    Validation { diagnostic: String },
}

impl ImportError {
    pub fn validation(diagnostic: impl Into<String>) -> Self {
        Self::Validation {
            diagnostic: diagnostic.into(),
        }
    }

    /// Build a diagnostic from a parser error, pointing at line and column.
    pub fn from_json(err: &serde_json::Error) -> Self {
        let message = err.to_string();
        // serde_json appends " at line L column C"; keep only the message part
        let message = message
            .split(" at line ")
            .next()
            .unwrap_or(&message)
            .to_string();
        Self::validation(format!(
            "line {}, column {}: {}",
            err.line(),
            err.column(),
            message
        ))
    }
}
