//! Bulk import/export of the `mcpServers` JSON document.
//!
//! The format is the one most MCP clients already read and write:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "fetch": { "command": "uvx", "args": ["mcp-server-fetch"] },
//!     "docs":  { "type": "sse", "baseUrl": "https://example.com/sse" }
//!   }
//! }
//! ```
//!
//! Keys are record ids. Parsing validates the whole document before any
//! record is produced; inserting the records is the caller's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Endpoint, Origin, ServerRecord, TransportType};
use crate::error::ImportError;

/// Top-level document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpServersDocument {
    #[serde(rename = "mcpServers")]
    pub mcp_servers: Map<String, Value>,
}

/// One entry under `mcpServers`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(default, alias = "url", skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Records parsed from a document, ready to insert.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    /// Inactive, origin `Imported`, in document order
    pub records: Vec<ServerRecord>,
    /// Ids whose entry asked for `isActive: true`
    pub activate: Vec<String>,
}

/// Parse and validate an import document.
pub fn parse_import(text: &str) -> Result<ParsedImport, ImportError> {
    let document: McpServersDocument =
        serde_json::from_str(text).map_err(|e| ImportError::from_json(&e))?;

    let mut parsed = ParsedImport::default();
    for (key, value) in document.mcp_servers {
        let id = key.trim().to_string();
        if id.is_empty() {
            return Err(ImportError::validation("server id must not be empty"));
        }

        let entry: ServerEntry = serde_json::from_value(value)
            .map_err(|e| ImportError::validation(format!("server \"{}\": {}", id, e)))?;

        if entry.is_active == Some(true) {
            parsed.activate.push(id.clone());
        }
        parsed.records.push(entry_to_record(&id, entry)?);
    }

    Ok(parsed)
}

fn entry_to_record(id: &str, entry: ServerEntry) -> Result<ServerRecord, ImportError> {
    let command = non_blank(entry.command);
    let base_url = non_blank(entry.base_url);

    let transport = match entry.transport.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => TransportType::parse(name).ok_or_else(|| {
            ImportError::validation(format!("server \"{}\": unknown type \"{}\"", id, name))
        })?,
        _ => match (&command, &base_url) {
            (Some(_), _) => TransportType::Stdio,
            (None, Some(url)) => TransportType::infer_from_url(url),
            (None, None) => {
                return Err(ImportError::validation(format!(
                    "server \"{}\": needs a command or a URL",
                    id
                )))
            }
        },
    };

    if transport == TransportType::Stdio && command.is_none() {
        return Err(ImportError::validation(format!(
            "server \"{}\": stdio servers need a command",
            id
        )));
    }
    if transport.is_remote() && base_url.is_none() {
        return Err(ImportError::validation(format!(
            "server \"{}\": {} servers need a URL",
            id, transport
        )));
    }

    let endpoint = Endpoint {
        base_url,
        command,
        args: entry.args,
        env: entry.env,
        headers: entry.headers,
    };
    let name = non_blank(entry.name).unwrap_or_else(|| id.to_string());

    let mut record = ServerRecord::new(id, name, transport, endpoint)
        .with_origin(Origin::Imported)
        .with_tags(entry.tags);
    record.description = non_blank(entry.description);
    record.provider = non_blank(entry.provider);
    record.provider_url = non_blank(entry.provider_url);
    record.logo_url = non_blank(entry.logo_url);
    Ok(record)
}

/// Build the export document, in registry order.
pub fn export_document(records: &[ServerRecord]) -> McpServersDocument {
    let mut mcp_servers = Map::new();

    for record in records {
        let entry = ServerEntry {
            name: Some(record.name.clone()),
            description: record.description.clone(),
            transport: Some(record.transport_type.as_str().to_string()),
            base_url: record.endpoint.base_url.clone(),
            command: record.endpoint.command.clone(),
            args: record.endpoint.args.clone(),
            env: record.endpoint.env.clone(),
            headers: record.endpoint.headers.clone(),
            provider: record.provider.clone(),
            provider_url: record.provider_url.clone(),
            logo_url: record.logo_url.clone(),
            tags: record.tags.clone(),
            is_active: Some(record.is_active),
        };
        // ServerEntry holds only strings, maps and a bool
        if let Ok(value) = serde_json::to_value(entry) {
            mcp_servers.insert(record.id.clone(), value);
        }
    }

    McpServersDocument { mcp_servers }
}

/// Export as pretty-printed JSON
pub fn export_json(records: &[ServerRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_document(records))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
