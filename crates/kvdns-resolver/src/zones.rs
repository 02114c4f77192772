//! Zone registry: process-local numeric ids for zone names.
//!
//! The name server identifies zones by an opaque integer it received from an
//! earlier SOA answer. Ids are allocated here the first time an SOA lookup
//! proves that a zone exists, and are never reassigned or evicted.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::constants::FIRST_ZONE_ID;

/// Zone identifier as exchanged with the name server (`domain_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bidirectional zone name <-> id mapping.
///
/// Invariant: `by_name` and `by_id` are mutual inverses.
#[derive(Debug)]
pub struct ZoneRegistry {
    by_name: HashMap<String, ZoneId>,
    by_id: HashMap<ZoneId, String>,
    next_id: i32,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            next_id: FIRST_ZONE_ID,
        }
    }
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone name registered under `id`.
    pub fn resolve(&self, id: ZoneId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    /// Id registered for `name`.
    pub fn id_of(&self, name: &str) -> Option<ZoneId> {
        self.by_name.get(name).copied()
    }

    /// Register a zone and return its id.
    ///
    /// A name that is already registered keeps its id.
    pub fn register(&mut self, name: &str) -> ZoneId {
        if let Some(id) = self.id_of(name) {
            return id;
        }
        let id = ZoneId(self.next_id);
        self.next_id += 1;
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
        info!(zone = %name, zone_id = %id, "registered zone");
        id
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
