//! JSON-RPC client for the storage engine socket

use async_trait::async_trait;
use bridge_common::config::{BackendAddress, BackendConfig};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::protocol::{RpcRequest, RpcResponse};

const READ_CHUNK_SIZE: usize = 4096;

/// Issues one backend call and returns its decoded `result`.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError>;
}

trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

type Connection = Box<dyn Stream>;

/// Client holding a single connection to the storage engine.
///
/// Calls are serialised on the connection: one request is written, its
/// response read back, then the next request may go out.
pub struct JsonRpcClient {
    address: BackendAddress,
    config: BackendConfig,
    timeout: Option<Duration>,
    next_id: AtomicU64,
    connection: Mutex<Option<Connection>>,
}

impl JsonRpcClient {
    pub fn new(config: &BackendConfig) -> bridge_common::Result<Self> {
        Ok(Self {
            address: config.parsed_address()?,
            config: config.clone(),
            timeout: config.call_timeout_ms.map(Duration::from_millis),
            next_id: AtomicU64::new(0),
            connection: Mutex::new(None),
        })
    }

    async fn connect(&self, method: &str) -> Result<Connection, RpcError> {
        let io_err = |source| RpcError::Io {
            method: method.to_string(),
            source,
        };

        let connection: Connection = match &self.address {
            BackendAddress::Unix(path) => Box::new(UnixStream::connect(path).await.map_err(io_err)?),
            BackendAddress::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await.map_err(io_err)?;
                stream.set_nodelay(true).ok();
                Box::new(stream)
            }
        };

        debug!(address = ?self.address, "connected to storage engine");
        Ok(connection)
    }

    async fn exchange(&self, method: &str, id: u64, payload: &[u8]) -> Result<RpcResponse, RpcError> {
        let mut guard = self.connection.lock().await;

        // Out of the slot until the round trip completes; a dropped call
        // leaves the slot empty.
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => self.connect(method).await?,
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, Self::round_trip(&mut stream, method, payload)).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout { method: method.to_string() }),
            },
            None => Self::round_trip(&mut stream, method, payload).await,
        };

        match &result {
            Ok(_) => *guard = Some(stream),
            Err(err) => warn!(method, id, error = %err, "dropping storage engine connection"),
        }
        result
    }

    async fn round_trip(stream: &mut Connection, method: &str, payload: &[u8]) -> Result<RpcResponse, RpcError> {
        let io_err = |source| RpcError::Io {
            method: method.to_string(),
            source,
        };

        stream.write_all(payload).await.map_err(io_err)?;
        stream.flush().await.map_err(io_err)?;

        let mut buffer = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let read = stream.read(&mut chunk).await.map_err(io_err)?;
            if read == 0 {
                return Err(RpcError::Eof { method: method.to_string() });
            }
            buffer.extend_from_slice(&chunk[..read]);

            // The engine does not delimit responses, so keep reading until one
            // complete JSON value has arrived.
            let mut values = serde_json::Deserializer::from_slice(&buffer).into_iter::<RpcResponse>();
            match values.next() {
                Some(Ok(response)) => return Ok(response),
                Some(Err(err)) if err.is_eof() => continue,
                Some(Err(source)) => {
                    return Err(RpcError::Codec {
                        method: method.to_string(),
                        source,
                    })
                }
                None => continue,
            }
        }
    }
}

#[async_trait]
impl RpcClient for JsonRpcClient {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let method = self.config.method_name(method);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let payload = RpcRequest::new(id, &method, params.as_ref()).to_bytes()?;

        debug!(method = %method, id, "sending storage engine request");
        let response = self.exchange(&method, id, &payload).await?;
        let result = response.into_result(&method, id);
        if let Err(err) = &result {
            debug!(method = %method, id, error = %err, "storage engine rejected request");
        }
        result
    }
}
