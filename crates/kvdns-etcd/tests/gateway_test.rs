//! EtcdGatewayStore against a minimal in-process stand-in for the gateway.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use kvdns_core::KeyValue;
use kvdns_core::KeyValueStore;
use kvdns_core::KeyValueStoreError;
use kvdns_core::ReadRequest;
use kvdns_core::ScanRequest;
use kvdns_etcd::EtcdConfig;
use kvdns_etcd::EtcdConfigError;
use kvdns_etcd::EtcdGatewayStore;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

const REVISION: u64 = 42;

/// Endpoint that refuses connections.
const DEAD_ENDPOINT: &str = "127.0.0.1:1";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Healthy,
    /// Answers the status probe but fails every range call with 503.
    RangeFails,
}

struct FakeGateway {
    data: Vec<(String, String)>,
    mode: Mode,
}

impl FakeGateway {
    fn respond(&self, path: &str, body: &[u8]) -> (u16, String) {
        match path {
            "/v3/maintenance/status" => (200, format!(r#"{{"header":{{"revision":"{REVISION}"}},"version":"3.5.9"}}"#)),
            "/v3/kv/range" if self.mode == Mode::RangeFails => (503, "{}".to_string()),
            "/v3/kv/range" => {
                let request: serde_json::Value = serde_json::from_slice(body).unwrap();
                let key = decode(request["key"].as_str().unwrap());
                let range_end = request["range_end"].as_str().map(decode);
                let kvs: Vec<serde_json::Value> = self
                    .data
                    .iter()
                    .filter(|(k, _)| match &range_end {
                        Some(end) => k.as_bytes() >= key.as_slice() && k.as_bytes() < end.as_slice(),
                        None => k.as_bytes() == key.as_slice(),
                    })
                    .map(|(k, v)| {
                        serde_json::json!({"key": BASE64.encode(k), "value": BASE64.encode(v), "version": "1"})
                    })
                    .collect();
                let mut response = serde_json::json!({"header": {"revision": REVISION.to_string()}});
                if !kvs.is_empty() {
                    response["count"] = serde_json::json!(kvs.len().to_string());
                    response["kvs"] = serde_json::json!(kvs);
                }
                (200, response.to_string())
            }
            _ => (404, "{}".to_string()),
        }
    }
}

fn decode(encoded: &str) -> Vec<u8> {
    BASE64.decode(encoded).unwrap()
}

async fn handle_connection(socket: TcpStream, gateway: Arc<FakeGateway>) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let path = request_line.split_whitespace().nth(1).unwrap_or_default().to_string();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).await?;

        let (status, reply) = gateway.respond(&path, &body);
        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{reply}",
            reply.len()
        );
        reader.get_mut().write_all(response.as_bytes()).await?;
    }
}

/// Start a fake gateway and return its `host:port`.
async fn spawn_gateway(data: &[(&str, &str)], mode: Mode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let gateway = Arc::new(FakeGateway {
        data: data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        mode,
    });
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handle_connection(socket, gateway.clone()));
        }
    });
    addr.to_string()
}

fn config(endpoints: Vec<String>) -> EtcdConfig {
    EtcdConfig {
        endpoints,
        dial_timeout: Duration::from_secs(1),
    }
}

const ZONE: &[(&str, &str)] = &[
    ("/dns/example.net/-defaults", r#"{"ttl":"1h"}"#),
    ("/dns/example.net/@/SOA", r#"{"primary":"ns1"}"#),
    ("/dns/example.net/www/A/1", "192.0.2.1"),
    ("/dns/example.net/www/A/2", "192.0.2.2"),
    ("/dns/example.org/@/SOA", "{}"),
];

#[tokio::test]
async fn test_read_and_scan() {
    let endpoint = spawn_gateway(ZONE, Mode::Healthy).await;
    let store = EtcdGatewayStore::connect(&config(vec![endpoint])).await.unwrap();

    let read = store.read(ReadRequest::new("/dns/example.net/@/SOA")).await.unwrap();
    assert_eq!(read.revision, REVISION);
    assert_eq!(read.kv, Some(KeyValue::new("/dns/example.net/@/SOA", r#"{"primary":"ns1"}"#)));

    let missing = store.read(ReadRequest::new("/dns/example.net/@/SOA-defaults")).await.unwrap();
    assert_eq!(missing.kv, None);

    let scan = store.scan(ScanRequest::new("/dns/example.net/www/A/")).await.unwrap();
    let keys: Vec<&str> = scan.entries.iter().map(|kv| kv.key.as_str()).collect();
    assert_eq!(keys, vec!["/dns/example.net/www/A/1", "/dns/example.net/www/A/2"]);

    let zone = store.scan(ScanRequest::new("/dns/example.net/")).await.unwrap();
    assert_eq!(zone.entries.len(), 4);
}

#[tokio::test]
async fn test_connect_skips_dead_endpoint() {
    let endpoint = spawn_gateway(ZONE, Mode::Healthy).await;
    let store = EtcdGatewayStore::connect(&config(vec![DEAD_ENDPOINT.to_string(), endpoint.clone()])).await.unwrap();
    assert_eq!(store.preferred_endpoint(), format!("http://{endpoint}"));
    assert_eq!(store.endpoints().len(), 2);
}

#[tokio::test]
async fn test_range_fails_over_on_server_error() {
    let failing = spawn_gateway(ZONE, Mode::RangeFails).await;
    let healthy = spawn_gateway(ZONE, Mode::Healthy).await;
    let store = EtcdGatewayStore::connect(&config(vec![failing.clone(), healthy.clone()])).await.unwrap();
    assert_eq!(store.preferred_endpoint(), format!("http://{failing}"));

    let read = store.read(ReadRequest::new("/dns/example.org/@/SOA")).await.unwrap();
    assert!(read.kv.is_some());
    assert_eq!(store.preferred_endpoint(), format!("http://{healthy}"));
}

#[tokio::test]
async fn test_all_endpoints_failing_is_unavailable() {
    let failing = spawn_gateway(ZONE, Mode::RangeFails).await;
    let store = EtcdGatewayStore::connect(&config(vec![failing])).await.unwrap();

    let err = store.scan(ScanRequest::new("/dns/")).await.unwrap_err();
    assert!(matches!(err, KeyValueStoreError::Unavailable { .. }), "{err}");
}

#[tokio::test]
async fn test_connect_fails_when_nothing_answers() {
    let err = EtcdGatewayStore::connect(&config(vec![DEAD_ENDPOINT.to_string()])).await.unwrap_err();
    assert!(matches!(err, EtcdConfigError::Unreachable { .. }), "{err}");
    assert!(err.to_string().contains("http://127.0.0.1:1"));
}
