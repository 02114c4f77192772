//! Versioned key-value store abstraction used by kvdns.
//!
//! The resolution engine only ever needs two read operations from its backing
//! store, both of which report the store-wide revision the answer was taken
//! at:
//!
//! - [`KeyValueStore::read`]: fetch a single key by exact match
//! - [`KeyValueStore::scan`]: fetch every key sharing a prefix
//!
//! # Revisions
//!
//! Every response carries the revision of the snapshot it was served from.
//! Revisions increase monotonically with every mutation anywhere in the store,
//! which makes them usable both as a cache-validity token and as an SOA serial.
//!
//! # Implementations
//!
//! - [`InMemoryKeyValueStore`]: ordered in-process map with its own revision
//!   counter, for tests and embedding
//! - `kvdns_etcd::EtcdGatewayStore`: etcd v3 over its JSON gateway

pub mod error;
pub mod inmemory;
pub mod kv;
pub mod traits;

pub use error::KeyValueStoreError;
pub use inmemory::InMemoryKeyValueStore;
pub use kv::KeyValue;
pub use kv::ReadRequest;
pub use kv::ReadResult;
pub use kv::ScanRequest;
pub use kv::ScanResult;
pub use traits::KeyValueStore;
