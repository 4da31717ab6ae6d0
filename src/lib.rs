//! NVMe Bridge - control plane for NVMe resources on a DPU storage engine
//!
//! The bridge is responsible for:
//! - Naming subsystems, controllers and namespaces
//! - Translating each client operation into storage engine calls
//! - Attaching namespaces to every controller of their subsystem, and
//!   detaching them again before deletion
//! - Paginating list results
//! - Mapping backend failures into client errors
//!
//! Resource state lives only in memory, inside one [`NvmeBridge`].

use bridge_common::utils::init_tracing;
use bridge_common::{bail, config::BridgeConfig, ensure, error::Result, BridgeError, FieldPaths, NvmeSubsystem};
use bridge_jsonrpc::{invoke, BackendMethod, JsonRpcClient, RpcClient};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub mod naming;
pub mod pagination;
pub mod store;

mod controller;
mod namespace;
mod subsystem;

pub use bridge_common as common;
pub use bridge_jsonrpc as jsonrpc;
pub use store::ResourceStore;

/// Handle to the bridge service.
///
/// Clones share the backend client and the resource store.
#[derive(Clone)]
pub struct NvmeBridge {
    /// Storage engine client
    client: Arc<dyn RpcClient>,
    /// Subsystems, controllers, namespaces and page tokens
    store: Arc<RwLock<ResourceStore>>,
    /// Held for the whole of every create, delete and update
    mutations: Arc<Mutex<()>>,
    /// Configuration
    config: Arc<BridgeConfig>,
    /// Aborts outstanding backend calls of this handle
    cancel: CancellationToken,
}

impl NvmeBridge {
    /// Create a bridge over an existing backend client
    pub fn new(client: Arc<dyn RpcClient>, config: BridgeConfig) -> Self {
        Self {
            client,
            store: Arc::new(RwLock::new(ResourceStore::new())),
            mutations: Arc::new(Mutex::new(())),
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a bridge talking JSON-RPC to the configured storage engine
    pub fn connect(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let client = JsonRpcClient::new(&config.backend)?;
        info!(address = %config.backend.address, "NVMe bridge using storage engine");
        Ok(Self::new(Arc::new(client), config))
    }

    /// Load configuration from the environment, install logging and connect
    pub fn from_env() -> Result<Self> {
        let config = BridgeConfig::load()?;
        init_tracing(&config.logging);
        Self::connect(config)
    }

    /// A handle sharing this bridge's state whose backend calls stop once
    /// `token` is cancelled.
    ///
    /// Cancellation aborts like any other backend failure: work already done
    /// on the backend is not undone.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..self.clone()
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Issue one backend call, giving up early on cancellation
    async fn call<M: BackendMethod>(&self, params: M::Params) -> Result<M::Output> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::cancelled());
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!(method = M::NAME, "backend call cancelled");
                Err(BridgeError::cancelled())
            }
            result = invoke::<M>(self.client.as_ref(), &params) => {
                result.map_err(|err| {
                    error!(method = M::NAME, error = %err, "backend call failed");
                    BridgeError::from(err)
                })
            }
        }
    }

    /// Stored subsystem by full name
    fn lookup_subsystem(&self, name: &str) -> Result<NvmeSubsystem> {
        self.store
            .read()
            .subsystems
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::not_found(name))
    }

    /// Stored subsystem owning a controller or namespace
    fn parent_of(&self, child_name: &str) -> Result<NvmeSubsystem> {
        let Some(parent) = naming::parent_subsystem_name(child_name) else {
            bail!(InvalidArgument, "invalid resource name: {}", child_name);
        };
        self.lookup_subsystem(&parent)
    }

    /// Resolve `(page_size, page_token)` into `(size, offset)`
    fn extract_pagination(&self, page_size: i32, page_token: &str) -> Result<(usize, usize)> {
        let store = self.store.read();
        pagination::extract_pagination(
            page_size,
            page_token,
            &store.page_tokens,
            self.config.pagination.max_page_size,
        )
    }

    /// Window `items` and mint the token for the following page, if any
    fn paginate<T>(&self, items: Vec<T>, size: usize, offset: usize) -> (Vec<T>, String) {
        let (window, has_more) = pagination::limit_to_pagination(items, offset, size);
        let next_page_token = if has_more {
            self.store.write().mint_page_token(offset + size)
        } else {
            String::new()
        };
        (window, next_page_token)
    }
}

/// Reject update masks naming fields the resource does not have
fn validate_update_mask<T: FieldPaths>(mask: Option<&[String]>) -> Result<()> {
    for path in mask.unwrap_or_default() {
        ensure!(
            path == "*" || T::FIELD_PATHS.contains(&path.as_str()),
            InvalidArgument,
            "invalid field path: {}",
            path
        );
    }
    Ok(())
}

/// Fail on an empty required string field
fn require(value: &str, field: &str) -> Result<()> {
    ensure!(!value.is_empty(), InvalidArgument, "missing required field: {}", field);
    Ok(())
}
