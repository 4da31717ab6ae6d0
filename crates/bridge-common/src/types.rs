//! Client-facing resource model and request/response types

use serde::{Deserialize, Serialize};

/// NVMe subsystem as seen by clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystem {
    pub name: String,
    pub spec: NvmeSubsystemSpec,
    pub status: NvmeSubsystemStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystemSpec {
    /// NVMe Qualified Name, unique among live subsystems
    pub nqn: String,
    pub serial_number: String,
    pub model_number: String,
    pub max_namespaces: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeSubsystemStatus {
    pub firmware_revision: String,
}

/// NVMe controller as seen by clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeController {
    pub name: String,
    pub spec: NvmeControllerSpec,
    pub status: NvmeControllerStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeControllerSpec {
    /// Requested controller id, `None` lets the backend pick one
    pub nvme_controller_id: Option<i32>,
    pub pcie_id: PciEndpoint,
    pub max_nsq: i32,
    pub max_ncq: i32,
    pub mqes: i32,
}

/// PCIe function a controller is exposed on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciEndpoint {
    /// PCIe domain
    pub port_id: i32,
    pub physical_function: i32,
    pub virtual_function: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeControllerStatus {
    pub active: bool,
}

/// NVMe namespace as seen by clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespace {
    pub name: String,
    pub spec: NvmeNamespaceSpec,
    pub status: NvmeNamespaceStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespaceSpec {
    /// Namespace id visible to the host
    pub host_nsid: i32,
    /// Backing block device
    pub volume_name_ref: String,
    pub nguid: String,
    pub eui64: i64,
    pub uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NvmeNamespaceStatus {
    pub pci_state: NamespacePciState,
    pub pci_oper_state: NamespacePciOperState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespacePciState {
    #[default]
    Unspecified,
    Enabled,
    Disabled,
    Deleting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespacePciOperState {
    #[default]
    Unspecified,
    Online,
    Offline,
}

/// I/O counters reported by the Stats operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStats {
    pub read_bytes_count: i64,
    pub read_ops_count: i64,
    pub write_bytes_count: i64,
    pub write_ops_count: i64,
    pub read_latency_ticks: i64,
    pub write_latency_ticks: i64,
}

/// Field paths accepted in an update mask
pub trait FieldPaths {
    const FIELD_PATHS: &'static [&'static str];
}

impl FieldPaths for NvmeSubsystem {
    const FIELD_PATHS: &'static [&'static str] = &[
        "name",
        "spec",
        "spec.nqn",
        "spec.serial_number",
        "spec.model_number",
        "spec.max_namespaces",
        "status",
        "status.firmware_revision",
    ];
}

impl FieldPaths for NvmeController {
    const FIELD_PATHS: &'static [&'static str] = &[
        "name",
        "spec",
        "spec.nvme_controller_id",
        "spec.pcie_id",
        "spec.pcie_id.port_id",
        "spec.pcie_id.physical_function",
        "spec.pcie_id.virtual_function",
        "spec.max_nsq",
        "spec.max_ncq",
        "spec.mqes",
        "status",
        "status.active",
    ];
}

impl FieldPaths for NvmeNamespace {
    const FIELD_PATHS: &'static [&'static str] = &[
        "name",
        "spec",
        "spec.host_nsid",
        "spec.volume_name_ref",
        "spec.nguid",
        "spec.eui64",
        "spec.uuid",
        "status",
        "status.pci_state",
        "status.pci_oper_state",
    ];
}

/// Create request, generic over the resource kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRequest<T> {
    /// Owning subsystem name, required for controllers and namespaces
    pub parent: String,
    pub resource: Option<T>,
    /// Caller-chosen short id, generated when empty
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
    /// Succeed without touching the backend when the resource is absent
    pub allow_missing: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest<T> {
    pub resource: Option<T>,
    pub update_mask: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {
    /// Owning subsystem name, ignored when listing subsystems
    pub parent: String,
    pub page_size: i32,
    pub page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    /// Empty once the final page has been returned
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: VolumeStats,
}

pub type CreateNvmeSubsystemRequest = CreateRequest<NvmeSubsystem>;
pub type CreateNvmeControllerRequest = CreateRequest<NvmeController>;
pub type CreateNvmeNamespaceRequest = CreateRequest<NvmeNamespace>;
pub type UpdateNvmeSubsystemRequest = UpdateRequest<NvmeSubsystem>;
pub type UpdateNvmeControllerRequest = UpdateRequest<NvmeController>;
pub type UpdateNvmeNamespaceRequest = UpdateRequest<NvmeNamespace>;
pub type ListNvmeSubsystemsResponse = ListResponse<NvmeSubsystem>;
pub type ListNvmeControllersResponse = ListResponse<NvmeController>;
pub type ListNvmeNamespacesResponse = ListResponse<NvmeNamespace>;
