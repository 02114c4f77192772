//! Wire types of the name-server pipe protocol.
//!
//! The name server writes one JSON object per line:
//!
//! ```json
//! {"method": "lookup", "parameters": {"qname": "www.example.net", "zone-id": 1, "qtype": "A"}}
//! ```
//!
//! and expects one JSON object per line in reply:
//!
//! ```json
//! {"result": [{"domain_id": 1, "qname": "www.example.net", "qtype": "A", "content": "192.0.2.1", "ttl": 3600, "auth": true}]}
//! {"result": false, "log": ["missing 'ttl'"]}
//! ```

use kvdns_resolver::LookupQuery;
use kvdns_resolver::ZoneId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Method of the handshake request.
pub const METHOD_INITIALIZE: &str = "initialize";

/// Method of a record lookup.
pub const METHOD_LOOKUP: &str = "lookup";

/// A request from the name server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Request {
    /// `method: {parameters}` form used in log lines and error messages.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.method, Value::Object(self.parameters.clone()))
    }
}

/// A reply to the name server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub result: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl Response {
    pub fn success(result: Value) -> Self {
        Self {
            result,
            log: Vec::new(),
        }
    }

    /// `{"result": false, "log": [message]}`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Value::Bool(false),
            log: vec![message.into()],
        }
    }

    pub fn with_log(mut self, log: Vec<String>) -> Self {
        self.log = log;
        self
    }
}

/// Parameters of a `lookup` request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LookupParameters {
    pub qname: String,
    /// Arrives as a JSON number; only its integer part is meaningful.
    #[serde(rename = "zone-id")]
    pub zone_id: f64,
    pub qtype: String,
}

impl LookupParameters {
    pub fn from_map(parameters: &Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(parameters.clone()))
    }

    pub fn to_query(&self) -> LookupQuery {
        LookupQuery::new(self.qname.as_str(), ZoneId(self.zone_id as i32), self.qtype.as_str())
    }
}
