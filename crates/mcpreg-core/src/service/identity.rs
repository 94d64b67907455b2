//! Identity resolution between a provider listing and the registry.
//!
//! Matching is by exact id. Only records the sync itself owns
//! (`Origin::Discovered`) are ever matched; user-owned records are
//! invisible to sync, and a discovered id that collides with one is dropped.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::ServerRecord;

/// Partition of a normalized listing against an existing snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Resolution {
    /// Ids not present in the snapshot
    pub added: Vec<ServerRecord>,
    /// Existing discovered records with provider-owned fields refreshed
    pub updated: Vec<ServerRecord>,
    /// Duplicates within the listing plus collisions with user-owned ids
    pub skipped: usize,
}

pub struct IdentityResolver;

impl IdentityResolver {
    /// Split `discovered` into adds and updates relative to `existing`.
    ///
    /// Every match is reported as updated, even when nothing changed.
    pub fn resolve(discovered: Vec<ServerRecord>, existing: &[ServerRecord]) -> Resolution {
        let by_id: HashMap<&str, &ServerRecord> =
            existing.iter().map(|r| (r.id.as_str(), r)).collect();
        let mut seen = HashSet::new();
        let mut resolution = Resolution::default();

        for incoming in discovered {
            if !seen.insert(incoming.id.clone()) {
                debug!(server_id = %incoming.id, "[Identity] Duplicate id in listing, keeping first");
                resolution.skipped += 1;
                continue;
            }

            match by_id.get(incoming.id.as_str()) {
                None => resolution.added.push(incoming),
                Some(current) if current.origin.is_user_owned() => {
                    debug!(
                        server_id = %incoming.id,
                        "[Identity] Id belongs to a user record, dropping discovered copy"
                    );
                    resolution.skipped += 1;
                }
                Some(current) => resolution.updated.push(refresh(current, incoming)),
            }
        }

        resolution
    }
}

/// Overwrite provider-owned fields of `current` with those of `incoming`.
///
/// Activation state and existing header values stay as the user left them;
/// header names the provider introduces are added.
pub fn refresh(current: &ServerRecord, incoming: ServerRecord) -> ServerRecord {
    let mut record = current.clone();
    record.name = incoming.name;
    record.description = incoming.description;
    record.logo_url = incoming.logo_url;
    record.tags = incoming.tags;
    record.endpoint.base_url = incoming.endpoint.base_url;
    record.provider = incoming.provider;
    record.provider_url = incoming.provider_url;

    for (name, value) in incoming.endpoint.headers {
        record.endpoint.headers.entry(name).or_insert(value);
    }

    record.touch();
    record
}
