mod common;

use common::{bridge, controller_request, namespace_request, subsystem_request, with_subsystem, ScriptedBackend, NQN};
use serde_json::json;
use std::time::Duration;

const PARENT: &str = "subsystems/subsys0";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_id_reach_backend_once() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    let bridge = bridge(&backend);
    backend.set_latency(Duration::from_millis(20));
    backend.reply("get_version", json!({ "status": 0, "version": "SPDK v20.10" }));

    let first = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.create_nvme_subsystem(subsystem_request("subsys0", NQN)).await }
    });
    let second = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.create_nvme_subsystem(subsystem_request("subsys0", NQN)).await }
    });

    let first = first.await??;
    let second = second.await??;

    assert_eq!(first, second);
    assert_eq!(first.status.firmware_revision, "SPDK v20.10");
    assert_eq!(backend.count("create_subsystem"), 1);
    assert_eq!(backend.count("get_version"), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_namespace_fan_out_sees_whole_controller_creates() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    let bridge = bridge(&backend);
    with_subsystem(&bridge, &backend).await;
    backend.set_latency(Duration::from_millis(20));
    backend.reply("subsys_create_ctrlr", json!({ "status": 0, "ctrlr_id": 1 }));

    let namespace = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.create_nvme_namespace(namespace_request(PARENT, "ns0", 1)).await }
    });
    let controller = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.create_nvme_controller(controller_request(PARENT, "ctrl0", None)).await }
    });
    namespace.await??;
    controller.await??;

    // Each create runs to completion before the other starts
    let methods = backend.methods();
    let controller_first = ["subsys_create_ctrlr", "subsys_alloc_ns", "ctrlr_attach_ns"];
    let namespace_first = ["subsys_alloc_ns", "subsys_create_ctrlr"];
    assert!(
        methods == controller_first || methods == namespace_first,
        "interleaved backend calls: {:?}",
        methods
    );
    Ok(())
}
