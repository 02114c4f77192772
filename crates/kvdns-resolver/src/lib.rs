//! Resolution engine for DNS lookups backed by a versioned key-value store.
//!
//! A lookup `(qname, zone id, qtype)` is mapped onto the store's key space,
//! answered with a single read, and each returned entry is turned into an
//! answer record. Entries are either verbatim record content or JSON objects
//! whose fields are merged with up to four scopes of defaults:
//!
//! 1. zone + subdomain + qtype (`/example.net/www/A-defaults`)
//! 2. zone + subdomain (`/example.net/www/-defaults`)
//! 3. zone + qtype (`/example.net/A-defaults`)
//! 4. zone (`/example.net/-defaults`)
//!
//! Defaults are cached per store revision; see [`defaults::DefaultsCache`].
//!
//! # Example
//!
//! ```
//! use kvdns_core::InMemoryKeyValueStore;
//! use kvdns_resolver::LookupQuery;
//! use kvdns_resolver::Resolver;
//! use kvdns_resolver::ResolverConfig;
//! use kvdns_resolver::ZoneId;
//!
//! # tokio_test_block_on(async {
//! let store = InMemoryKeyValueStore::new();
//! store.put("/example.net/-defaults", r#"{"ttl": "1h"}"#);
//! store.put("/example.net/@/A/1", r#"{"ip": "192.0.2.1"}"#);
//!
//! let mut resolver = Resolver::new(store, ResolverConfig::default());
//! let items = resolver.lookup(&LookupQuery::new("example.net", ZoneId(0), "A")).await.unwrap();
//! assert_eq!(items[0].content, "192.0.2.1");
//! assert_eq!(items[0].ttl, 3600);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

pub mod address;
pub mod constants;
mod deadline;
pub mod defaults;
pub mod error;
pub mod keys;
pub mod records;
pub mod resolver;
pub mod value;
pub mod zones;

pub use error::ErrorKind;
pub use error::ResolveError;
pub use error::ResolveResult;
pub use keys::KeySpace;
pub use keys::QueryParts;
pub use records::RecordType;
pub use resolver::LookupQuery;
pub use resolver::Resolver;
pub use resolver::ResolverConfig;
pub use resolver::ResultItem;
pub use value::FieldMap;
pub use value::FieldValue;
pub use zones::ZoneId;
pub use zones::ZoneRegistry;
