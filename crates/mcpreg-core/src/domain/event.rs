//! Domain Events
//!
//! Registry and lifecycle changes are published as events so that
//! presentation layers (toasts, lists, tray badges) can react without
//! the core knowing about them.

use serde::{Deserialize, Serialize};

use super::ProviderKey;

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

/// Activation state of one server.
///
/// There is no terminal error state: every failure path lands back on
/// `Inactive`, which can always be re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Inactive,
    /// Reachability check in flight
    Probing,
    Active,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Probing => "probing",
            Self::Active => "active",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DOMAIN EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ServerAdded {
        server_id: String,
        server_name: String,
    },
    ServerUpdated {
        server_id: String,
    },
    ServerRemoved {
        server_id: String,
    },
    /// Lifecycle transition.
    ///
    /// `notify_user` is false for probe failures that should stay quiet.
    ServerStatusChanged {
        server_id: String,
        state: LifecycleState,
        notify_user: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    ProviderSynced {
        provider: ProviderKey,
        added: usize,
        updated: usize,
    },
    /// The provider rejected its token and the vault entry was dropped
    ProviderTokenCleared {
        provider: ProviderKey,
    },
}

impl DomainEvent {
    /// Short name used in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ServerAdded { .. } => "server_added",
            Self::ServerUpdated { .. } => "server_updated",
            Self::ServerRemoved { .. } => "server_removed",
            Self::ServerStatusChanged { .. } => "server_status_changed",
            Self::ProviderSynced { .. } => "provider_synced",
            Self::ProviderTokenCleared { .. } => "provider_token_cleared",
        }
    }

    /// Server this event concerns, if any
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::ServerAdded { server_id, .. }
            | Self::ServerUpdated { server_id }
            | Self::ServerRemoved { server_id }
            | Self::ServerStatusChanged { server_id, .. } => Some(server_id),
            Self::ProviderSynced { .. } | Self::ProviderTokenCleared { .. } => None,
        }
    }
}
