//! In-process key-value store with a global revision counter.
//!
//! Behaves like a single-node etcd for the purposes of kvdns: every mutation
//! bumps one store-wide revision, reads report the revision they observed, and
//! exact reads can be served from any past revision. Nothing is compacted.
//! Mutations are exposed as inherent methods only; the [`KeyValueStore`] trait
//! itself stays read-only.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::KeyValueStoreError;
use crate::kv::KeyValue;
use crate::kv::ReadRequest;
use crate::kv::ReadResult;
use crate::kv::ScanRequest;
use crate::kv::ScanResult;
use crate::traits::KeyValueStore;

/// Every version of a key, oldest first. `None` marks a deletion.
type History = Vec<(u64, Option<Vec<u8>>)>;

#[derive(Default)]
struct State {
    data: BTreeMap<String, History>,
    revision: u64,
}

impl State {
    fn value_at(&self, key: &str, revision: u64) -> Option<&Vec<u8>> {
        let history = self.data.get(key)?;
        history.iter().rev().find(|(modified, _)| *modified <= revision)?.1.as_ref()
    }
}

/// A deterministic in-memory key-value store.
///
/// Thread-safe. Reads and scans are counted so callers can observe how many
/// round-trips a component performed, and reads can be made to fail on demand
/// to exercise error paths.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    state: RwLock<State>,
    reads: AtomicU64,
    scans: AtomicU64,
    is_unavailable: AtomicBool,
}

impl InMemoryKeyValueStore {
    /// Create an empty store at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the new store revision.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> u64 {
        let mut state = self.state.write();
        state.revision += 1;
        let revision = state.revision;
        state.data.entry(key.into()).or_default().push((revision, Some(value.into())));
        revision
    }

    /// Remove a key, returning the new store revision.
    ///
    /// The revision advances even if the key did not exist.
    pub fn delete(&self, key: &str) -> u64 {
        let mut state = self.state.write();
        state.revision += 1;
        let revision = state.revision;
        if let Some(history) = state.data.get_mut(key) {
            history.push((revision, None));
        }
        revision
    }

    /// Current store-wide revision.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Number of exact reads served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of prefix scans served so far.
    pub fn scan_count(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Make every subsequent read and scan fail with
    /// [`KeyValueStoreError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, is_unavailable: bool) {
        self.is_unavailable.store(is_unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<(), KeyValueStoreError> {
        if self.is_unavailable.load(Ordering::Relaxed) {
            return Err(KeyValueStoreError::Unavailable {
                reason: "in-memory store switched off".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        let at = request.revision.unwrap_or(state.revision);
        if at > state.revision {
            return Err(KeyValueStoreError::Failed {
                reason: format!("revision {at} is in the future (current {})", state.revision),
            });
        }
        trace!(key = %request.key, at, revision = state.revision, "in-memory read");
        Ok(ReadResult {
            kv: state.value_at(&request.key, at).map(|value| KeyValue::new(request.key.clone(), value.clone())),
            revision: state.revision,
        })
    }

    async fn scan(&self, request: ScanRequest) -> Result<ScanResult, KeyValueStoreError> {
        self.check_available()?;
        self.scans.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        let entries: Vec<KeyValue> = state
            .data
            .range(request.prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&request.prefix))
            .filter_map(|(key, history)| {
                let value = history.last()?.1.as_ref()?;
                Some(KeyValue::new(key.clone(), value.clone()))
            })
            .collect();
        trace!(prefix = %request.prefix, count = entries.len(), revision = state.revision, "in-memory scan");
        Ok(ScanResult {
            entries,
            revision: state.revision,
        })
    }
}
