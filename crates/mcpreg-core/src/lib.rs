//! # McpReg Core Library
//!
//! Keeps a local registry of MCP servers in sync with remote provider
//! directories, without ever touching what the user authored.
//!
//! ## Modules
//!
//! - `branding` - Product naming constants
//! - `config` - Timeouts and provider base URLs
//! - `domain` - ServerRecord, ProviderKey, SyncResult, events
//! - `error` - Typed errors for adapters, registry and import
//! - `provider` - One adapter per provider directory
//! - `repository` - Store, TokenVault and ServerRuntime traits
//! - `service` - Sync engine, identity resolution, registry, probe, bulk JSON
//! - `application` - Orchestration with event emission
//! - `event_bus` - Broadcast of domain events

pub mod application;
pub mod branding;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod provider;
pub mod repository;
pub mod service;

pub use domain::*;
pub use error::{ImportError, ProviderError, RegistryError};
pub use repository::*;
pub use service::*;

pub use application::{
    ApplicationServices, ApplicationServicesBuilder, ImportFailure, ImportReport,
    LifecycleController, ProbeHandle, SyncAppService, SyncReport,
};
pub use config::SyncConfig;
pub use event_bus::{EventBus, EventReceiver, EventSender, SharedEventBus};
pub use provider::{ProviderAdapter, ProviderSet, RawListing};
