//! `KeyValueStore` over the etcd v3 JSON gateway.
//!
//! etcd exposes its gRPC KV API as JSON over HTTP (`POST /v3/kv/range`). Keys
//! and values travel base64-encoded and 64-bit integers such as revisions are
//! rendered as JSON strings. A prefix scan is a range from the prefix to the
//! prefix with its last incrementable byte bumped.
//!
//! Several endpoints may be configured. Requests go to the endpoint that last
//! answered and fail over to the others in order when it becomes unreachable.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kvdns_core::KeyValue;
use kvdns_core::KeyValueStore;
use kvdns_core::KeyValueStoreError;
use kvdns_core::ReadRequest;
use kvdns_core::ReadResult;
use kvdns_core::ScanRequest;
use kvdns_core::ScanResult;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use snafu::ResultExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::EtcdConfig;
use crate::config::endpoint_url;
use crate::error::BuildClientSnafu;
use crate::error::NoEndpointsSnafu;
use crate::error::Result;
use crate::error::UnreachableSnafu;

/// Gateway path of the range (get) call.
pub const RANGE_PATH: &str = "/v3/kv/range";

/// Gateway path used to probe endpoint health.
pub const STATUS_PATH: &str = "/v3/maintenance/status";

type StoreResult<T> = std::result::Result<T, KeyValueStoreError>;

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_end: Option<String>,
    /// Point-in-time read; etcd serves the latest revision when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    revision: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseHeader {
    #[serde(default, deserialize_with = "revision_from_json")]
    revision: u64,
}

#[derive(Debug, Deserialize)]
struct GatewayKeyValue {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    header: ResponseHeader,
    #[serde(default)]
    kvs: Vec<GatewayKeyValue>,
}

/// Revisions are int64 and therefore quoted by the gateway; accept both forms.
fn revision_from_json<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(revision) => Ok(revision),
        Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

impl RangeResponse {
    fn into_entries(self) -> StoreResult<(Vec<KeyValue>, u64)> {
        let entries = self
            .kvs
            .into_iter()
            .map(|kv| {
                let key = decode_base64("key", &kv.key)?;
                let value = decode_base64("value", &kv.value)?;
                Ok(KeyValue::new(String::from_utf8_lossy(&key).into_owned(), value))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((entries, self.header.revision))
    }
}

fn decode_base64(what: &str, encoded: &str) -> StoreResult<Vec<u8>> {
    BASE64.decode(encoded).map_err(|e| KeyValueStoreError::InvalidResponse {
        reason: format!("{what} is not valid base64: {e}"),
    })
}

/// End of the key range covering every key that starts with `prefix`.
///
/// The last byte below `0xff` is incremented and everything after it dropped.
/// A prefix made only of `0xff` bytes (or an empty one) yields `\0`, which
/// etcd reads as "to the end of the key space".
pub fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    match prefix.iter().rposition(|&b| b < 0xff) {
        Some(idx) => {
            let mut end = prefix[..=idx].to_vec();
            end[idx] += 1;
            end
        }
        None => vec![0],
    }
}

/// etcd v3 client speaking the JSON gateway protocol.
#[derive(Debug)]
pub struct EtcdGatewayStore {
    client: reqwest::Client,
    /// Base URLs, in configured order.
    endpoints: Vec<String>,
    /// Index of the endpoint that answered last.
    preferred: AtomicUsize,
}

impl EtcdGatewayStore {
    /// Build a client and make sure at least one endpoint answers.
    pub async fn connect(config: &EtcdConfig) -> Result<Self> {
        snafu::ensure!(!config.endpoints.is_empty(), NoEndpointsSnafu);
        let client = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout)
            .build()
            .context(BuildClientSnafu)?;
        let store = Self {
            client,
            endpoints: config.endpoints.iter().map(|e| endpoint_url(e)).collect(),
            preferred: AtomicUsize::new(0),
        };
        store.probe(config.dial_timeout).await?;
        Ok(store)
    }

    /// Base URLs this store talks to.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Base URL of the endpoint requests currently go to first.
    pub fn preferred_endpoint(&self) -> &str {
        &self.endpoints[self.preferred.load(Ordering::Relaxed) % self.endpoints.len()]
    }

    async fn probe(&self, timeout: Duration) -> Result<()> {
        let mut last_error = String::from("no endpoint tried");
        for (idx, base) in self.endpoints.iter().enumerate() {
            let url = format!("{base}{STATUS_PATH}");
            let sent = self.client.post(&url).json(&serde_json::json!({})).timeout(timeout).send().await;
            match sent.and_then(|response| response.error_for_status()) {
                Ok(_) => {
                    self.preferred.store(idx, Ordering::Relaxed);
                    info!(endpoint = %base, "connected to etcd");
                    return Ok(());
                }
                Err(e) => {
                    warn!(endpoint = %base, error = %e, "etcd endpoint did not answer status probe");
                    last_error = e.to_string();
                }
            }
        }
        UnreachableSnafu {
            endpoints: self.endpoints.join(", "),
            reason: last_error,
        }
        .fail()
    }

    async fn range(&self, request: RangeRequest) -> StoreResult<(Vec<KeyValue>, u64)> {
        let start = self.preferred.load(Ordering::Relaxed);
        let mut last_error = String::from("no endpoint configured");
        for offset in 0..self.endpoints.len() {
            let idx = (start + offset) % self.endpoints.len();
            let base = &self.endpoints[idx];
            match self.post_range(base, &request).await {
                Ok(response) => {
                    if offset != 0 {
                        self.preferred.store(idx, Ordering::Relaxed);
                        info!(endpoint = %base, "failed over to etcd endpoint");
                    }
                    return response.into_entries();
                }
                Err(KeyValueStoreError::Unavailable { reason }) => {
                    debug!(endpoint = %base, reason = %reason, "etcd endpoint unavailable");
                    last_error = reason;
                }
                Err(e) => return Err(e),
            }
        }
        Err(KeyValueStoreError::Unavailable { reason: last_error })
    }

    /// One range call against one endpoint.
    ///
    /// Transport failures and 5xx answers are `Unavailable` and make the
    /// caller try the next endpoint; anything else is final.
    async fn post_range(&self, base: &str, request: &RangeRequest) -> StoreResult<RangeResponse> {
        let url = format!("{base}{RANGE_PATH}");
        let response =
            self.client.post(&url).json(request).send().await.map_err(|e| KeyValueStoreError::Unavailable {
                reason: format!("{base}: {e}"),
            })?;
        let status = response.status();
        if status.is_server_error() {
            return Err(KeyValueStoreError::Unavailable {
                reason: format!("{base}: HTTP {status}"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KeyValueStoreError::Failed {
                reason: format!("{base}: HTTP {status}: {}", body.trim()),
            });
        }
        response.json::<RangeResponse>().await.map_err(|e| KeyValueStoreError::InvalidResponse {
            reason: format!("{base}: {e}"),
        })
    }
}

#[async_trait]
impl KeyValueStore for EtcdGatewayStore {
    async fn read(&self, request: ReadRequest) -> StoreResult<ReadResult> {
        let (entries, revision) = self
            .range(RangeRequest {
                key: BASE64.encode(&request.key),
                range_end: None,
                revision: request.revision,
            })
            .await?;
        Ok(ReadResult {
            kv: entries.into_iter().find(|kv| kv.key == request.key),
            revision,
        })
    }

    async fn scan(&self, request: ScanRequest) -> StoreResult<ScanResult> {
        let range_end = prefix_range_end(request.prefix.as_bytes());
        let (entries, revision) = self
            .range(RangeRequest {
                key: BASE64.encode(&request.prefix),
                range_end: Some(BASE64.encode(range_end)),
                revision: None,
            })
            .await?;
        Ok(ScanResult { entries, revision })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_range_end() {
        assert_eq!(prefix_range_end(b"/dns/example.net/"), b"/dns/example.net0".to_vec());
        assert_eq!(prefix_range_end(b"a"), b"b".to_vec());
        assert_eq!(prefix_range_end(&[b'a', 0xff]), b"b".to_vec());
        assert_eq!(prefix_range_end(&[0xff, 0xff]), vec![0]);
        assert_eq!(prefix_range_end(b""), vec![0]);
    }

    #[test]
    fn test_range_request_encoding() {
        let exact = RangeRequest {
            key: BASE64.encode("/dns/example.net/@/SOA"),
            range_end: None,
            revision: None,
        };
        assert_eq!(
            serde_json::to_value(&exact).unwrap(),
            serde_json::json!({"key": "L2Rucy9leGFtcGxlLm5ldC9AL1NPQQ=="})
        );

        let scan = RangeRequest {
            key: BASE64.encode("a/"),
            range_end: Some(BASE64.encode(prefix_range_end(b"a/"))),
            revision: None,
        };
        assert_eq!(serde_json::to_value(&scan).unwrap()["range_end"], "YTA=");

        let pinned = RangeRequest {
            key: BASE64.encode("a"),
            range_end: None,
            revision: Some(17),
        };
        assert_eq!(serde_json::to_value(&pinned).unwrap(), serde_json::json!({"key": "YQ==", "revision": 17}));
    }

    #[test]
    fn test_range_response_decoding() {
        let body = r#"{
            "header": {"cluster_id": "14841639068965178418", "revision": "42", "raft_term": "2"},
            "kvs": [
                {"key": "L2EvMQ==", "create_revision": "5", "mod_revision": "42", "version": "3", "value": "eyJ0dGwiOjYwfQ=="},
                {"key": "L2EvMg==", "create_revision": "6", "mod_revision": "6", "version": "1"}
            ],
            "count": "2"
        }"#;
        let response: RangeResponse = serde_json::from_str(body).unwrap();
        let (entries, revision) = response.into_entries().unwrap();
        assert_eq!(revision, 42);
        assert_eq!(entries[0], KeyValue::new("/a/1", r#"{"ttl":60}"#));
        assert_eq!(entries[1], KeyValue::new("/a/2", Vec::new()));
    }

    #[test]
    fn test_empty_range_response() {
        let response: RangeResponse = serde_json::from_str(r#"{"header": {"revision": 7}}"#).unwrap();
        let (entries, revision) = response.into_entries().unwrap();
        assert!(entries.is_empty());
        assert_eq!(revision, 7);
    }

    #[test]
    fn test_bad_base64_is_invalid_response() {
        let response: RangeResponse =
            serde_json::from_str(r#"{"header": {"revision": "1"}, "kvs": [{"key": "!!", "value": ""}]}"#).unwrap();
        let err = response.into_entries().unwrap_err();
        assert!(matches!(err, KeyValueStoreError::InvalidResponse { .. }));
    }

    #[test]
    fn test_non_numeric_revision_rejected() {
        assert!(serde_json::from_str::<RangeResponse>(r#"{"header": {"revision": "many"}}"#).is_err());
    }

    #[tokio::test]
    async fn test_connect_without_endpoints() {
        let config = EtcdConfig::with_endpoints(Vec::new());
        let err = EtcdGatewayStore::connect(&config).await.unwrap_err();
        assert!(matches!(err, crate::EtcdConfigError::NoEndpoints));
    }
}
