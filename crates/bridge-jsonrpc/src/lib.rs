//! # Bridge JSON-RPC
//!
//! Client side of the storage engine's JSON-RPC protocol: the socket client,
//! the request/response envelopes, and the typed method catalogue the bridge
//! drives.

pub mod client;
pub mod error;
pub mod methods;
pub mod protocol;

pub use client::{JsonRpcClient, RpcClient};
pub use error::RpcError;
pub use methods::{invoke, BackendMethod, HasStatus};
