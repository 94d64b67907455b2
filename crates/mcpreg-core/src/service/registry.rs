//! Server registry
//!
//! The single in-memory list of `ServerRecord`s, persisted write-through to
//! a `Store` under one key. Every mutation builds the next list, persists it
//! and only then swaps it in, so a failed write leaves memory untouched.
//! The write lock is held across the persist, which serializes mutations.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::{DomainEvent, ServerRecord, SyncResult};
use crate::error::RegistryError;
use crate::event_bus::EventSender;
use crate::repository::Store;

/// Store key holding the serialized registry
pub const REGISTRY_KEY: &str = "mcp_servers";

/// Ids touched by one `merge`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: Vec<String>,
    pub updated: Vec<String>,
}

pub struct ServerRegistry {
    store: Arc<dyn Store>,
    servers: RwLock<Vec<ServerRecord>>,
    event_sender: Option<EventSender>,
}

impl ServerRegistry {
    /// Empty registry backed by `store`. Nothing is read until `load`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            servers: RwLock::new(Vec::new()),
            event_sender: None,
        }
    }

    /// Restore the persisted registry, or start empty if none was saved.
    pub async fn load(store: Arc<dyn Store>) -> Result<Self, RegistryError> {
        let servers = match store
            .get(REGISTRY_KEY)
            .await
            .map_err(RegistryError::Persistence)?
        {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(&json)?,
            _ => Vec::new(),
        };

        info!(count = servers.len(), "[Registry] Loaded servers");
        Ok(Self {
            store,
            servers: RwLock::new(servers),
            event_sender: None,
        })
    }

    /// Publish add/update/remove events on the bus
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    // ============================================
    // Reads
    // ============================================

    /// Snapshot of every record, in insertion order
    pub async fn list(&self) -> Vec<ServerRecord> {
        self.servers.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<ServerRecord> {
        self.servers.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.servers.read().await.iter().any(|s| s.id == id)
    }

    pub async fn len(&self) -> usize {
        self.servers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.servers.read().await.is_empty()
    }

    /// Case-insensitive match over name, description, tags and provider.
    /// An empty query matches everything.
    pub async fn search(&self, query: &str) -> Vec<ServerRecord> {
        let query = query.trim().to_lowercase();
        let servers = self.servers.read().await;
        if query.is_empty() {
            return servers.clone();
        }

        servers
            .iter()
            .filter(|s| matches_query(s, &query))
            .cloned()
            .collect()
    }

    // ============================================
    // Mutations
    // ============================================

    /// Insert a new record. Fails with `DuplicateId` if the id exists.
    pub async fn add(&self, record: ServerRecord) -> Result<(), RegistryError> {
        let mut servers = self.servers.write().await;
        if servers.iter().any(|s| s.id == record.id) {
            return Err(RegistryError::DuplicateId(record.id));
        }

        let event = DomainEvent::ServerAdded {
            server_id: record.id.clone(),
            server_name: record.name.clone(),
        };

        let mut next = servers.clone();
        next.push(record);
        self.persist(&next).await?;
        *servers = next;
        drop(servers);

        self.emit(event);
        Ok(())
    }

    /// Overwrite the record with the same id, stamping `updated_at`.
    pub async fn replace(&self, mut record: ServerRecord) -> Result<(), RegistryError> {
        let mut servers = self.servers.write().await;
        let index = position(&servers, &record.id)?;
        let server_id = record.id.clone();
        record.touch();

        let mut next = servers.clone();
        next[index] = record;
        self.persist(&next).await?;
        *servers = next;
        drop(servers);

        self.emit(DomainEvent::ServerUpdated { server_id });
        Ok(())
    }

    /// Delete a record, returning it.
    pub async fn remove(&self, id: &str) -> Result<ServerRecord, RegistryError> {
        let mut servers = self.servers.write().await;
        let index = position(&servers, id)?;

        let mut next = servers.clone();
        let removed = next.remove(index);
        self.persist(&next).await?;
        *servers = next;
        drop(servers);

        info!(server_id = %id, "[Registry] Removed server");
        self.emit(DomainEvent::ServerRemoved {
            server_id: id.to_string(),
        });
        Ok(removed)
    }

    /// Flip `is_active`, returning the updated record.
    pub async fn set_active(&self, id: &str, active: bool) -> Result<ServerRecord, RegistryError> {
        let mut servers = self.servers.write().await;
        let index = position(&servers, id)?;
        if servers[index].is_active == active {
            return Ok(servers[index].clone());
        }

        let mut next = servers.clone();
        next[index].is_active = active;
        next[index].touch();
        let updated = next[index].clone();
        self.persist(&next).await?;
        *servers = next;
        drop(servers);

        self.emit(DomainEvent::ServerUpdated {
            server_id: id.to_string(),
        });
        Ok(updated)
    }

    /// Commit a successful sync in one write.
    ///
    /// The result was computed against an earlier snapshot, so it is
    /// reconciled with the current list: an updated record keeps the
    /// activation state it has now and is dropped if it was removed in the
    /// meantime; an added id that appeared meanwhile is refreshed instead,
    /// unless it now belongs to a user record.
    pub async fn merge(&self, result: &SyncResult) -> Result<MergeOutcome, RegistryError> {
        let mut outcome = MergeOutcome::default();
        if !result.success || result.total() == 0 {
            return Ok(outcome);
        }

        let mut servers = self.servers.write().await;
        let mut next = servers.clone();

        for record in &result.added {
            match next.iter().position(|s| s.id == record.id) {
                None => {
                    next.push(record.clone());
                    outcome.added.push(record.id.clone());
                }
                Some(index) if next[index].origin.is_user_owned() => {
                    warn!(server_id = %record.id, "[Registry] Id taken by a user record, not merged");
                }
                Some(index) => {
                    let refreshed = super::identity::refresh(&next[index], record.clone());
                    next[index] = refreshed;
                    outcome.updated.push(record.id.clone());
                }
            }
        }

        for record in &result.updated {
            match next.iter().position(|s| s.id == record.id) {
                Some(index) if !next[index].origin.is_user_owned() => {
                    let is_active = next[index].is_active;
                    next[index] = record.clone();
                    next[index].is_active = is_active;
                    outcome.updated.push(record.id.clone());
                }
                _ => debug!(server_id = %record.id, "[Registry] Updated record no longer present"),
            }
        }

        self.persist(&next).await?;
        *servers = next;
        drop(servers);

        info!(
            provider = %result.provider,
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            "[Registry] Merged sync result"
        );

        for record in &result.added {
            if outcome.added.contains(&record.id) {
                self.emit(DomainEvent::ServerAdded {
                    server_id: record.id.clone(),
                    server_name: record.name.clone(),
                });
            }
        }
        for server_id in &outcome.updated {
            self.emit(DomainEvent::ServerUpdated {
                server_id: server_id.clone(),
            });
        }

        Ok(outcome)
    }

    async fn persist(&self, servers: &[ServerRecord]) -> Result<(), RegistryError> {
        let json = serde_json::to_string(servers)
            .map_err(|e| RegistryError::Persistence(e.into()))?;

        self.store.put(REGISTRY_KEY, &json).await.map_err(|e| {
            warn!(error = %e, "[Registry] Failed to persist, keeping previous state");
            RegistryError::Persistence(e)
        })
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(sender) = &self.event_sender {
            sender.emit(event);
        }
    }
}

fn position(servers: &[ServerRecord], id: &str) -> Result<usize, RegistryError> {
    servers
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| RegistryError::NotFound(id.to_string()))
}

fn matches_query(record: &ServerRecord, query: &str) -> bool {
    let contains = |value: &str| value.to_lowercase().contains(query);

    contains(&record.name)
        || record.description.as_deref().is_some_and(contains)
        || record.provider.as_deref().is_some_and(contains)
        || record.tags.iter().any(|t| contains(t))
}
