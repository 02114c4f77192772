//! Read request and result types.

use serde::Deserialize;
use serde::Serialize;

/// A single stored entry.
///
/// Values are raw bytes: the store does not interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key identifying this entry.
    pub key: String,
    /// The stored value.
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Request to read a single key by exact match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub key: String,
    /// Serve the read from this store revision instead of the latest one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl ReadRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            revision: None,
        }
    }

    /// Read `key` as it was at `revision`.
    pub fn at_revision(key: impl Into<String>, revision: u64) -> Self {
        Self {
            key: key.into(),
            revision: Some(revision),
        }
    }
}

/// Response from a read operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResult {
    /// The entry, if the key exists.
    pub kv: Option<KeyValue>,
    /// Store-wide revision the read was served at.
    pub revision: u64,
}

/// Request to read every key starting with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub prefix: String,
}

impl ScanRequest {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

/// Response from a scan operation.
///
/// Entries are ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub entries: Vec<KeyValue>,
    /// Store-wide revision the scan was served at.
    pub revision: u64,
}

impl From<ReadResult> for ScanResult {
    fn from(result: ReadResult) -> Self {
        Self {
            entries: result.kv.into_iter().collect(),
            revision: result.revision,
        }
    }
}
