//! The request loop: handshake, then one response per lookup.
//!
//! Requests are handled strictly in order. The [`Resolver`] is owned by the
//! loop, so zone and defaults state is only ever touched by one request at a
//! time.

use async_trait::async_trait;
use kvdns_core::KeyValueStore;
use kvdns_etcd::EtcdConfig;
use kvdns_etcd::EtcdConfigError;
use kvdns_etcd::EtcdGatewayStore;
use kvdns_resolver::Resolver;
use serde_json::Value;
use snafu::ResultExt;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::BackendConfig;
use crate::error::EncodeResponseSnafu;
use crate::error::MalformedRequestSnafu;
use crate::error::PipeError;
use crate::error::ReadInputSnafu;
use crate::error::Result;
use crate::error::WriteOutputSnafu;
use crate::protocol::LookupParameters;
use crate::protocol::METHOD_INITIALIZE;
use crate::protocol::METHOD_LOOKUP;
use crate::protocol::Request;
use crate::protocol::Response;

/// Opens the store once `initialize` has been processed.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: KeyValueStore + 'static;
    type Error: std::fmt::Display + Send;

    async fn connect(&self, config: &EtcdConfig) -> std::result::Result<Self::Store, Self::Error>;
}

/// Connects to etcd over its JSON gateway.
#[derive(Debug, Default, Clone, Copy)]
pub struct EtcdConnector;

#[async_trait]
impl StoreConnector for EtcdConnector {
    type Store = EtcdGatewayStore;
    type Error = EtcdConfigError;

    async fn connect(&self, config: &EtcdConfig) -> std::result::Result<EtcdGatewayStore, EtcdConfigError> {
        EtcdGatewayStore::connect(config).await
    }
}

/// One pipe session over a line-oriented reader and writer.
pub struct PipeServer<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl<R, W> PipeServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    /// Run the session until end of input.
    ///
    /// Returns an error for everything that must end the process: malformed
    /// input, a first request other than `initialize`, bad `initialize`
    /// parameters, an unreachable store, or a broken output stream. For the
    /// last three a failure response is written before returning.
    pub async fn run<C: StoreConnector>(mut self, connector: &C) -> Result<()> {
        let Some(request) = self.read_request().await? else {
            info!("EOF on input stream before initialize, terminating");
            return Ok(());
        };
        if request.method != METHOD_INITIALIZE {
            return Err(PipeError::NotInitialized { method: request.method });
        }

        let mut resolver = self.initialize(&request, connector).await?;

        loop {
            let Some(request) = self.read_request().await? else {
                info!("EOF on input stream, terminating");
                return Ok(());
            };
            debug!(request = %request.describe(), "request");
            let response = match request.method.as_str() {
                METHOD_LOOKUP => lookup(&mut resolver, &request).await,
                _ => Response::failure(format!("unknown/unimplemented request: {}", request.describe())),
            };
            self.respond(&response).await?;
        }
    }

    async fn initialize<C: StoreConnector>(&mut self, request: &Request, connector: &C) -> Result<Resolver<C::Store>> {
        let config = match BackendConfig::from_parameters(&request.parameters) {
            Ok(config) => config,
            Err(e) => return self.fail(e).await,
        };
        let store = match connector.connect(&config.store).await {
            Ok(store) => store,
            Err(e) => {
                let message = e.to_string();
                return self.fail(PipeError::Connect { message }).await;
            }
        };

        let log = config.log_messages();
        self.respond(&Response::success(Value::Bool(true)).with_log(log.clone())).await?;
        info!(
            prefix = %config.prefix,
            endpoints = ?config.store.endpoints,
            config_file = ?config.config_file,
            timeout = ?config.timeout,
            "initialized. {}",
            log.join(". ")
        );
        Ok(Resolver::new(store, config.resolver_config()))
    }

    /// Report a fatal error to the name server, then return it.
    async fn fail<T>(&mut self, err: PipeError) -> Result<T> {
        error!(error = %err, "fatal error");
        self.respond(&Response::failure(err.to_string())).await?;
        Err(err)
    }

    /// Next request, or `None` at end of input. Blank lines are skipped.
    async fn read_request(&mut self) -> Result<Option<Request>> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await.context(ReadInputSnafu)?;
            if read == 0 {
                return Ok(None);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return serde_json::from_str(line).map(Some).context(MalformedRequestSnafu);
        }
    }

    async fn respond(&mut self, response: &Response) -> Result<()> {
        let mut encoded = serde_json::to_vec(response).context(EncodeResponseSnafu)?;
        encoded.push(b'\n');
        self.writer.write_all(&encoded).await.context(WriteOutputSnafu)?;
        self.writer.flush().await.context(WriteOutputSnafu)
    }
}

async fn lookup<S: KeyValueStore>(resolver: &mut Resolver<S>, request: &Request) -> Response {
    let query = match LookupParameters::from_map(&request.parameters) {
        Ok(params) => params.to_query(),
        Err(e) => {
            warn!(error = %e, "invalid lookup parameters");
            return Response::failure(format!("invalid lookup parameters: {e}"));
        }
    };
    match resolver.lookup(&query).await {
        Ok(items) => {
            debug!(qname = %query.qname, qtype = %query.qtype, count = items.len(), "lookup answered");
            match serde_json::to_value(&items) {
                Ok(result) => Response::success(result),
                Err(e) => Response::failure(format!("failed to encode result: {e}")),
            }
        }
        Err(e) => {
            warn!(qname = %query.qname, qtype = %query.qtype, kind = %e.kind(), error = %e, "lookup failed");
            Response::failure(e.to_string())
        }
    }
}
