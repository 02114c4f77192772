//! kvdns: a name-server backend that answers DNS lookups from etcd.
//!
//! The name server (PowerDNS with its pipe/remote backend) starts the
//! `kvdns-pipe` binary and talks to it over stdin/stdout, one JSON object per
//! line. The first request configures the backend and connects to the store;
//! every following `lookup` is answered by the
//! [`Resolver`](kvdns_resolver::Resolver).
//!
//! - [`protocol`]: request/response wire types
//! - [`config`]: `initialize` parameters
//! - [`server`]: the request loop and the store connection seam

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::BackendConfig;
pub use error::PipeError;
pub use server::EtcdConnector;
pub use server::PipeServer;
pub use server::StoreConnector;
