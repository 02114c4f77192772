//! etcd v3 backend for kvdns.
//!
//! [`EtcdGatewayStore`] implements [`kvdns_core::KeyValueStore`] on top of
//! etcd's JSON gateway, so it needs nothing beyond HTTP to reach a cluster.
//! [`EtcdConfig`] holds the endpoint list and dial timeout, built from
//! `initialize` parameters or loaded from an etcd client YAML file.

pub mod config;
pub mod error;
pub mod store;

pub use config::EtcdConfig;
pub use config::parse_endpoints;
pub use error::EtcdConfigError;
pub use store::EtcdGatewayStore;
pub use store::prefix_range_end;
