//! ServerRecord entity - the canonical representation of one MCP server
//!
//! Every server in the registry is a `ServerRecord`, whether it was
//! discovered through a provider directory, authored by the user, or
//! brought in through a bulk JSON import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::ProviderKey;

/// Transport used to reach an MCP server.
///
/// Only recorded as metadata; the protocol itself is spoken elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransportType {
    /// Local process via stdio
    #[default]
    Stdio,
    /// Remote server via Server-Sent Events
    Sse,
    /// Remote server via Streamable HTTP
    StreamableHttp,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamableHttp",
        }
    }

    /// Parse a transport name, accepting the spellings seen in the wild.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "sse" => Some(Self::Sse),
            "streamablehttp" | "streamable_http" | "streamable-http" | "http" => {
                Some(Self::StreamableHttp)
            }
            _ => None,
        }
    }

    /// Infer a remote transport from its URL: `/sse` endpoints speak SSE,
    /// everything else is assumed to be Streamable HTTP.
    pub fn infer_from_url(url: &str) -> Self {
        let path = url::Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.to_string());

        if path.trim_end_matches('/').ends_with("/sse") {
            Self::Sse
        } else {
            Self::StreamableHttp
        }
    }

    /// Whether this transport is reached over the network
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Stdio)
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record came from. Sync only ever touches `Discovered` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// Merged from a provider directory listing
    Discovered,
    /// Authored by the user
    #[default]
    UserCreated,
    /// Brought in through a bulk JSON import
    Imported,
}

impl Origin {
    /// User-owned records are never matched, mutated or shadowed by sync
    pub fn is_user_owned(&self) -> bool {
        matches!(self, Self::UserCreated | Self::Imported)
    }
}

/// Connection details. Only the fields relevant to the transport are set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// HTTP headers; values may hold user-supplied secrets
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Endpoint {
    /// Remote endpoint at `url`
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            base_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Local process endpoint
    pub fn local(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }
}

/// One discovered or user-defined MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    /// Unique in the registry, never reassigned.
    ///
    /// Discovered records use `@<provider>/<native id>`.
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default)]
    pub transport_type: TransportType,

    #[serde(default)]
    pub endpoint: Endpoint,

    /// Provider display name for discovered records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether the server is enabled for use
    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub origin: Origin,

    /// Path of the DXT package this server was installed from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dxt_path: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ServerRecord {
    /// Create an inactive record with the given id.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        transport_type: TransportType,
        endpoint: Endpoint,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            transport_type,
            endpoint,
            provider: None,
            provider_url: None,
            logo_url: None,
            tags: Vec::new(),
            is_active: false,
            origin: Origin::default(),
            dxt_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a user-authored record with a freshly generated id.
    pub fn user_created(
        name: impl Into<String>,
        transport_type: TransportType,
        endpoint: Endpoint,
    ) -> Self {
        Self::new(generate_local_id(), name, transport_type, endpoint)
            .with_origin(Origin::UserCreated)
    }

    /// Create a discovered record namespaced under `provider`.
    pub fn discovered(
        provider: ProviderKey,
        native_id: &str,
        name: impl Into<String>,
        transport_type: TransportType,
        endpoint: Endpoint,
    ) -> Self {
        Self::new(
            provider.namespaced_id(native_id),
            name,
            transport_type,
            endpoint,
        )
        .with_origin(Origin::Discovered)
        .with_provider(provider.display_name())
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_provider_url(mut self, url: impl Into<String>) -> Self {
        self.provider_url = Some(url.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_dxt_path(mut self, path: impl Into<String>) -> Self {
        self.dxt_path = Some(path.into());
        self
    }

    /// Set enabled state
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Stamp the record as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether probe failures for this server should stay quiet.
    ///
    /// Discovered and DXT-installed servers commonly need extra user
    /// configuration before they answer.
    pub fn suppresses_probe_alarm(&self) -> bool {
        self.origin == Origin::Discovered || self.dxt_path.is_some()
    }
}

/// Generate a unique id for a user-authored record.
pub fn generate_local_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("local-{}", &id[..12])
}
