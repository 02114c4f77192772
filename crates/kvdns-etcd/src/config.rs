//! Client configuration: endpoint list and dial timeout.
//!
//! Configuration comes either from `initialize` parameters (a `|`-separated
//! endpoint list plus a timeout) or from an etcd client YAML file:
//!
//! ```yaml
//! endpoints:
//!   - http://10.0.0.1:2379
//!   - http://10.0.0.2:2379
//! dial-timeout: 5s
//! ```
//!
//! Unknown keys in the file are ignored.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use snafu::ResultExt;

use crate::error::InvalidDialTimeoutSnafu;
use crate::error::NoEndpointsSnafu;
use crate::error::ParseYamlSnafu;
use crate::error::ReadFileSnafu;
use crate::error::Result;

/// Endpoints tried when none are configured.
pub const DEFAULT_ENDPOINTS: [&str; 2] = ["[::1]:2379", "127.0.0.1:2379"];

/// Default time allowed for reaching an endpoint.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Separator of the `endpoints` initialize parameter.
pub const ENDPOINT_SEPARATOR: char = '|';

/// Settings for [`EtcdGatewayStore`](crate::EtcdGatewayStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtcdConfig {
    /// Endpoints in preference order, as given (scheme optional).
    pub endpoints: Vec<String>,
    /// Bound on establishing a connection and on the startup probe.
    pub dial_timeout: Duration,
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    endpoints: Vec<String>,
    #[serde(rename = "dial-timeout")]
    dial_timeout: Option<String>,
}

impl EtcdConfig {
    /// Configuration for an explicit endpoint list.
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            ..Self::default()
        }
    }

    /// Load configuration from an etcd client YAML file.
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        let file: ConfigFile = serde_yaml::from_str(&contents).context(ParseYamlSnafu { path })?;
        Self::from_parsed(file)
    }

    fn from_parsed(file: ConfigFile) -> Result<Self> {
        let endpoints: Vec<String> =
            file.endpoints.into_iter().map(|e| e.trim().to_string()).filter(|e| !e.is_empty()).collect();
        snafu::ensure!(!endpoints.is_empty(), NoEndpointsSnafu);
        let dial_timeout = match file.dial_timeout {
            Some(value) => {
                humantime::parse_duration(value.trim()).context(InvalidDialTimeoutSnafu { value: value.as_str() })?
            }
            None => DEFAULT_DIAL_TIMEOUT,
        };
        Ok(Self {
            endpoints,
            dial_timeout,
        })
    }
}

/// Split a `|`-separated endpoint list, dropping empty entries.
pub fn parse_endpoints(list: &str) -> Vec<String> {
    list.split(ENDPOINT_SEPARATOR).map(str::trim).filter(|e| !e.is_empty()).map(str::to_string).collect()
}

/// Base URL for an endpoint, adding `http://` when no scheme is given.
pub fn endpoint_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::EtcdConfigError;

    #[test]
    fn test_default_config() {
        let config = EtcdConfig::default();
        assert_eq!(config.endpoints, vec!["[::1]:2379", "127.0.0.1:2379"]);
        assert_eq!(config.dial_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_endpoints() {
        assert_eq!(parse_endpoints("10.0.0.1:2379|10.0.0.2:2379"), vec!["10.0.0.1:2379", "10.0.0.2:2379"]);
        assert_eq!(parse_endpoints(" a:1 ||b:2| "), vec!["a:1", "b:2"]);
        assert!(parse_endpoints("").is_empty());
    }

    #[test]
    fn test_endpoint_url() {
        assert_eq!(endpoint_url("127.0.0.1:2379"), "http://127.0.0.1:2379");
        assert_eq!(endpoint_url("[::1]:2379"), "http://[::1]:2379");
        assert_eq!(endpoint_url("https://etcd.example.net:2379/"), "https://etcd.example.net:2379");
    }

    fn load(yaml: &str) -> Result<EtcdConfig> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        EtcdConfig::from_config_file(file.path())
    }

    #[test]
    fn test_yaml_config() {
        let config =
            load("endpoints:\n  - http://10.0.0.1:2379\n  - 10.0.0.2:2379\ndial-timeout: 5s\nauto-sync-interval: 30s\n")
                .unwrap();
        assert_eq!(config.endpoints, vec!["http://10.0.0.1:2379", "10.0.0.2:2379"]);
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_yaml_without_endpoints_rejected() {
        let err = load("dial-timeout: 5s\n").unwrap_err();
        assert!(matches!(err, EtcdConfigError::NoEndpoints));
    }

    #[test]
    fn test_yaml_bad_dial_timeout() {
        let err = load("endpoints: ['a:1']\ndial-timeout: soon\n").unwrap_err();
        assert!(matches!(err, EtcdConfigError::InvalidDialTimeout { .. }));
    }

    #[test]
    fn test_dial_timeout_defaults() {
        let config = load("endpoints: ['127.0.0.1:23790']\n").unwrap();
        assert_eq!(config.endpoints, vec!["127.0.0.1:23790"]);
        assert_eq!(config.dial_timeout, DEFAULT_DIAL_TIMEOUT);
    }

    #[test]
    fn test_config_file_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        let err = EtcdConfig::from_config_file(&missing).unwrap_err();
        assert!(matches!(err, EtcdConfigError::ReadFile { .. }));
        assert!(err.to_string().contains("missing.yaml"));

        let bad = dir.path().join("bad.yaml");
        std::fs::write(&bad, "endpoints: [unclosed\n").unwrap();
        let err = EtcdConfig::from_config_file(&bad).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"), "{err}");
    }
}
