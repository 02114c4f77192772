//! Errors raised while configuring and connecting the etcd client.

use std::path::PathBuf;

use snafu::Snafu;

/// Errors from building an [`EtcdConfig`](crate::EtcdConfig) or connecting
/// an [`EtcdGatewayStore`](crate::EtcdGatewayStore).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtcdConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse YAML config file {}: {source}", path.display()))]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("invalid dial-timeout '{value}': {source}"))]
    InvalidDialTimeout {
        value: String,
        source: humantime::DurationError,
    },

    #[snafu(display("no etcd endpoints configured"))]
    NoEndpoints,

    #[snafu(display("failed to create HTTP client: {source}"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("no etcd endpoint reachable ({endpoints}): {reason}"))]
    Unreachable { endpoints: String, reason: String },
}

pub type Result<T, E = EtcdConfigError> = std::result::Result<T, E>;
