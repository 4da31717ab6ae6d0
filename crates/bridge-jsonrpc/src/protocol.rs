//! JSON-RPC 2.0 envelopes exchanged with the storage engine

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Value>,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Option<&'a Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RpcError> {
        serde_json::to_vec(self).map_err(|source| RpcError::Codec {
            method: self.method.to_string(),
            source,
        })
    }
}

impl RpcErrorObject {
    /// Backends send a zeroed error object alongside successful results
    pub fn is_error(&self) -> bool {
        self.code != 0 || !self.message.is_empty()
    }
}

impl RpcResponse {
    /// Check correlation and the error object, then hand back `result`
    pub fn into_result(self, method: &str, expected_id: u64) -> Result<Value, RpcError> {
        if self.id != Some(expected_id) {
            return Err(RpcError::IdMismatch {
                method: method.to_string(),
                expected: expected_id,
                received: self.id,
            });
        }

        if let Some(error) = self.error.filter(RpcErrorObject::is_error) {
            return Err(RpcError::Response {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(raw: &str) -> RpcResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_request_omits_missing_params() {
        let bytes = RpcRequest::new(7, "get_version", None).to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "id": 7, "method": "get_version"}));

        let params = json!({"subnqn": "nqn.2022-09.io.spdk:opi3"});
        let bytes = RpcRequest::new(8, "delete_subsystem", Some(&params)).to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["params"]["subnqn"], "nqn.2022-09.io.spdk:opi3");
    }

    #[test]
    fn test_zeroed_error_object_is_success() {
        let reply = response(r#"{"jsonrpc":"2.0","id":1,"error":{"code":0,"message":""},"result":{"status":0}}"#);
        assert_eq!(reply.into_result("create_subsystem", 1).unwrap(), json!({"status": 0}));
    }

    #[test]
    fn test_error_object_is_reported() {
        let reply = response(r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#);
        let err = reply.into_result("ns_get_stats", 2).unwrap_err();
        assert_eq!(err.to_string(), "ns_get_stats: json response error: Method not found");
    }

    #[test]
    fn test_id_mismatch() {
        let reply = response(r#"{"jsonrpc":"2.0","id":5,"result":{"status":0}}"#);
        let err = reply.into_result("get_subsys_list", 4).unwrap_err();
        assert!(matches!(err, RpcError::IdMismatch { expected: 4, received: Some(5), .. }));
    }

    #[test]
    fn test_missing_result_is_null() {
        let reply = response(r#"{"jsonrpc":"2.0","id":3}"#);
        assert_eq!(reply.into_result("get_version", 3).unwrap(), Value::Null);
    }
}
