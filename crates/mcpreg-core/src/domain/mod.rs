//! Domain entities, value objects, and events
//!
//! - Entities (ServerRecord)
//! - Value Objects (TransportType, Endpoint, Origin, ProviderKey, LifecycleState)
//! - Results (SyncResult)
//! - Domain Events (DomainEvent)

mod event;
mod provider;
mod server;
mod sync_result;

pub use event::{DomainEvent, LifecycleState};
pub use provider::*;
pub use server::*;
pub use sync_result::*;
