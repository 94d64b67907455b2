//! Domain services
//!
//! Sync, identity resolution, the registry itself, reachability probing
//! and the bulk JSON format.

pub mod bulk_config;
mod identity;
mod probe;
mod registry;
mod sync_engine;

pub use bulk_config::{export_json, parse_import, McpServersDocument, ParsedImport, ServerEntry};
pub use identity::{IdentityResolver, Resolution};
pub use probe::{ConnectivityProbe, HttpConnectivityProbe, ProbeVerdict};
pub use registry::{MergeOutcome, ServerRegistry, REGISTRY_KEY};
pub use sync_engine::SyncEngine;
