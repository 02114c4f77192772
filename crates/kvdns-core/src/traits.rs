//! The store trait the resolution engine is written against.

use async_trait::async_trait;

use crate::error::KeyValueStoreError;
use crate::kv::ReadRequest;
use crate::kv::ReadResult;
use crate::kv::ScanRequest;
use crate::kv::ScanResult;

/// Read-only access to a consistent, versioned key-value store.
///
/// Both operations report the store-wide revision the answer was taken at.
/// Implementations must not retry internally in a way that would mix
/// revisions within a single response.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a single key by exact match.
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError>;

    /// Read every key that starts with the given prefix, ordered by key.
    async fn scan(&self, request: ScanRequest) -> Result<ScanResult, KeyValueStoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    async fn read(&self, request: ReadRequest) -> Result<ReadResult, KeyValueStoreError> {
        (**self).read(request).await
    }

    async fn scan(&self, request: ScanRequest) -> Result<ScanResult, KeyValueStoreError> {
        (**self).scan(request).await
    }
}
