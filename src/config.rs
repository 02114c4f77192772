//! Backend configuration from the `initialize` handshake.
//!
//! Recognized parameters, all optional:
//!
//! | Parameter | Meaning | Default |
//! |-----------|---------|---------|
//! | `prefix` | key prefix of all zones | `""` |
//! | `configFile` | etcd client YAML file (endpoints, dial timeout) | none |
//! | `endpoints` | `|`-separated endpoint list, ignored with `configFile` | `[::1]:2379\|127.0.0.1:2379` |
//! | `timeout` | dial timeout and per-lookup store timeout, e.g. `"1500ms"` | `2s` |
//!
//! Any other parameter is ignored.

use std::path::PathBuf;
use std::time::Duration;

use kvdns_etcd::EtcdConfig;
use kvdns_etcd::parse_endpoints;
use kvdns_resolver::ResolverConfig;
use kvdns_resolver::constants::DEFAULT_TIMEOUT;
use serde_json::Map;
use serde_json::Value;

use crate::error::PipeError;
use crate::error::Result;

pub const PARAM_PREFIX: &str = "prefix";
pub const PARAM_CONFIG_FILE: &str = "configFile";
pub const PARAM_ENDPOINTS: &str = "endpoints";
pub const PARAM_TIMEOUT: &str = "timeout";

/// Everything `initialize` determines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub prefix: String,
    /// Per-lookup store timeout.
    pub timeout: Duration,
    /// Set when the store settings came from a client config file.
    pub config_file: Option<PathBuf>,
    pub store: EtcdConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            timeout: DEFAULT_TIMEOUT,
            config_file: None,
            store: EtcdConfig::default(),
        }
    }
}

impl BackendConfig {
    /// Build the configuration from `initialize` parameters.
    ///
    /// Error messages are the ones reported back to the name server.
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(prefix) = parameters.get(PARAM_PREFIX) {
            config.prefix = string_parameter(PARAM_PREFIX, prefix)?.to_string();
        }

        if let Some(timeout) = parameters.get(PARAM_TIMEOUT) {
            let timeout = parse_timeout(string_parameter(PARAM_TIMEOUT, timeout)?)?;
            config.timeout = timeout;
            config.store.dial_timeout = timeout;
        }

        if let Some(path) = parameters.get(PARAM_CONFIG_FILE) {
            let path = PathBuf::from(string_parameter(PARAM_CONFIG_FILE, path)?);
            config.store = EtcdConfig::from_config_file(&path).map_err(|e| PipeError::InvalidParameter {
                message: format!("Failed to create client instance: {e}"),
            })?;
            config.config_file = Some(path);
        } else if let Some(endpoints) = parameters.get(PARAM_ENDPOINTS) {
            let endpoints = parse_endpoints(string_parameter(PARAM_ENDPOINTS, endpoints)?);
            if endpoints.is_empty() {
                return Err(invalid("parameters.endpoints is empty"));
            }
            config.store.endpoints = endpoints;
        }

        Ok(config)
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            prefix: self.prefix.clone(),
            timeout: self.timeout,
        }
    }

    /// Log lines returned with a successful `initialize`.
    pub fn log_messages(&self) -> Vec<String> {
        vec![format!("prefix: '{}'", self.prefix)]
    }
}

fn string_parameter<'a>(name: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| invalid(&format!("parameters.{name} is not a string")))
}

fn parse_timeout(text: &str) -> Result<Duration> {
    let timeout = humantime::parse_duration(text.trim()).map_err(|_| invalid("Failed to parse timeout value"))?;
    if timeout.is_zero() {
        return Err(invalid("Non-positive timeout value"));
    }
    Ok(timeout)
}

fn invalid(message: &str) -> PipeError {
    PipeError::InvalidParameter {
        message: message.to_string(),
    }
}
