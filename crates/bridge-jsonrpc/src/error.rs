//! Backend call failures

use bridge_common::BridgeError;
use std::io;
use thiserror::Error;

/// Why a backend call failed. Every variant is prefixed with the method name.
#[derive(Error, Debug)]
pub enum RpcError {
    /// The backend closed the connection before answering
    #[error("{method}: EOF")]
    Eof { method: String },

    /// The response answered a different request
    #[error("{method}: json response ID mismatch")]
    IdMismatch {
        method: String,
        expected: u64,
        received: Option<u64>,
    },

    /// The backend returned a JSON-RPC error object
    #[error("{method}: json response error: {message}")]
    Response {
        method: String,
        code: i64,
        message: String,
    },

    /// Connecting, writing or reading failed
    #[error("{method}: {source}")]
    Io {
        method: String,
        #[source]
        source: io::Error,
    },

    /// Encoding the request or decoding the response failed
    #[error("{method}: {source}")]
    Codec {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// No answer within the configured call timeout
    #[error("{method}: timed out")]
    Timeout { method: String },
}

impl From<RpcError> for BridgeError {
    fn from(err: RpcError) -> Self {
        BridgeError::Unknown(err.to_string())
    }
}
