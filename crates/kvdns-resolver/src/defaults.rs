//! Revision-scoped cache of decoded defaults objects.
//!
//! Defaults are merged across four scopes, so a merge is only correct if all
//! four objects come from the same store snapshot. The cache therefore tracks
//! exactly one revision: whenever a lookup observes a different revision the
//! whole cache is dropped, never individual keys. Loads are pinned to that
//! revision, so a write landing between the record read and a defaults read
//! is not mixed into the answer.

use std::collections::HashMap;

use kvdns_core::KeyValueStore;
use kvdns_core::ReadRequest;
use snafu::ResultExt;
use tracing::debug;
use tracing::trace;

use crate::deadline::Deadline;
use crate::error::DecodeSnafu;
use crate::error::ResolveResult;
use crate::value::FieldMap;

/// Cache of defaults objects keyed by store key.
#[derive(Debug, Default)]
pub struct DefaultsCache {
    revision: Option<u64>,
    entries: HashMap<String, FieldMap>,
}

impl DefaultsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision the cached entries belong to, if any lookup has run yet.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Align the cache with the revision a lookup just read at.
    ///
    /// Returns `true` if the cache was cleared.
    pub fn observe_revision(&mut self, revision: u64) -> bool {
        if self.revision == Some(revision) {
            return false;
        }
        debug!(
            old_revision = ?self.revision,
            new_revision = revision,
            dropped = self.entries.len(),
            "clearing defaults cache"
        );
        self.revision = Some(revision);
        self.entries.clear();
        true
    }

    /// Cached defaults for `key`. Loaded-but-absent keys yield an empty map.
    pub fn get(&self, key: &str) -> Option<&FieldMap> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch and decode `key` unless it is already cached.
    ///
    /// The read is served at the observed revision, or at the latest one
    /// before any revision was observed. A missing key is cached as an empty
    /// object.
    pub(crate) async fn ensure_loaded<S>(
        &mut self,
        store: &S,
        key: &str,
        deadline: Deadline,
    ) -> ResolveResult<()>
    where S: KeyValueStore + ?Sized {
        if self.entries.contains_key(key) {
            trace!(key = %key, "reusing defaults");
            return Ok(());
        }
        debug!(key = %key, revision = ?self.revision, "loading defaults");
        let request = match self.revision {
            Some(revision) => ReadRequest::at_revision(key, revision),
            None => ReadRequest::new(key),
        };
        let result = deadline.run(store.read(request)).await?;
        let defaults = match result.kv {
            Some(kv) => serde_json::from_slice::<FieldMap>(&kv.value).context(DecodeSnafu { key })?,
            None => FieldMap::new(),
        };
        self.entries.insert(key.to_string(), defaults);
        Ok(())
    }
}
