//! Scripted storage engine shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use nvme_bridge::common::{BridgeConfig, CreateRequest, NvmeController, NvmeNamespace, NvmeSubsystem};
use nvme_bridge::jsonrpc::{RpcClient, RpcError};
use nvme_bridge::NvmeBridge;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const NQN: &str = "nqn.2022-09.io.spdk:opi3";

/// Replies to each method from its own queue and records every call.
///
/// A method with an empty queue answers `{"status": 0}`.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<HashMap<String, VecDeque<Result<Value, RpcError>>>>,
    calls: Mutex<Vec<(String, Option<Value>)>>,
    latency: Mutex<Option<Duration>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, value: Value) {
        self.replies
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    pub fn fail(&self, method: &str, err: RpcError) {
        self.replies
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(Err(err));
    }

    /// Hold every later reply for `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>)> {
        self.calls.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl RpcClient for ScriptedBackend {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params));
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let reply = self
            .replies
            .lock()
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        reply.unwrap_or_else(|| Ok(json!({ "status": 0 })))
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("nvme_bridge=debug")
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn bridge(backend: &Arc<ScriptedBackend>) -> NvmeBridge {
    init_tracing();
    NvmeBridge::new(backend.clone(), BridgeConfig::default())
}

pub fn subsystem_request(id: &str, nqn: &str) -> CreateRequest<NvmeSubsystem> {
    let mut subsystem = NvmeSubsystem::default();
    subsystem.spec.nqn = nqn.to_string();
    subsystem.spec.serial_number = "OPI-SN-1".to_string();
    subsystem.spec.model_number = "OPI Model".to_string();
    subsystem.spec.max_namespaces = 32;
    CreateRequest {
        parent: String::new(),
        resource: Some(subsystem),
        id: id.to_string(),
    }
}

pub fn controller_request(parent: &str, id: &str, ctrlr_id: Option<i32>) -> CreateRequest<NvmeController> {
    let mut controller = NvmeController::default();
    controller.spec.nvme_controller_id = ctrlr_id;
    controller.spec.pcie_id.physical_function = 1;
    controller.spec.max_nsq = 17;
    controller.spec.max_ncq = 17;
    controller.spec.mqes = 2048;
    CreateRequest {
        parent: parent.to_string(),
        resource: Some(controller),
        id: id.to_string(),
    }
}

pub fn namespace_request(parent: &str, id: &str, nsid: i32) -> CreateRequest<NvmeNamespace> {
    let mut namespace = NvmeNamespace::default();
    namespace.spec.host_nsid = nsid;
    namespace.spec.volume_name_ref = "Malloc0".to_string();
    namespace.spec.nguid = "1b4e28ba-2fa1-11d2-883f-b9a761bde3fb".to_string();
    namespace.spec.uuid = "1b4e28ba-2fa1-11d2-883f-b9a761bde3fb".to_string();
    namespace.spec.eui64 = 1967554867335598546;
    CreateRequest {
        parent: parent.to_string(),
        resource: Some(namespace),
        id: id.to_string(),
    }
}

/// Subsystem `subsystems/subsys0` with NQN [`NQN`], created against a
/// backend that accepts everything
pub async fn with_subsystem(bridge: &NvmeBridge, backend: &ScriptedBackend) -> NvmeSubsystem {
    backend.reply("get_version", json!({ "status": 0, "version": "SPDK v20.10" }));
    let subsystem = bridge
        .create_nvme_subsystem(subsystem_request("subsys0", NQN))
        .await
        .expect("subsystem created");
    backend.clear_calls();
    subsystem
}

/// Controller under `subsystems/subsys0`, assigned `ctrlr_id` by the backend
pub async fn with_controller(
    bridge: &NvmeBridge,
    backend: &ScriptedBackend,
    id: &str,
    ctrlr_id: i32,
) -> NvmeController {
    backend.reply("subsys_create_ctrlr", json!({ "status": 0, "ctrlr_id": ctrlr_id }));
    let controller = bridge
        .create_nvme_controller(controller_request("subsystems/subsys0", id, None))
        .await
        .expect("controller created");
    backend.clear_calls();
    controller
}
