//! Typed catalogue of storage engine methods.
//!
//! Each method is a unit type pairing its wire name with its parameter and
//! result shapes. The set is closed: only this module can add methods.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::RpcClient;
use crate::error::RpcError;

mod sealed {
    pub trait Sealed {}
}

/// Backend results all carry an integer status, `0` meaning success.
pub trait HasStatus {
    fn status(&self) -> i32;

    fn is_success(&self) -> bool {
        self.status() == 0
    }
}

/// A storage engine method with its request and response shapes
pub trait BackendMethod: sealed::Sealed {
    const NAME: &'static str;
    type Params: Serialize + Send + Sync;
    type Output: DeserializeOwned + HasStatus + Send;
}

/// Encode `params`, call `M` and decode its result
pub async fn invoke<M: BackendMethod>(
    client: &dyn RpcClient,
    params: &M::Params,
) -> Result<M::Output, RpcError> {
    let params = serde_json::to_value(params).map_err(|source| RpcError::Codec {
        method: M::NAME.to_string(),
        source,
    })?;
    let params = (!params.is_null()).then_some(params);

    let value = client.call(M::NAME, params).await?;
    serde_json::from_value(value).map_err(|source| RpcError::Codec {
        method: M::NAME.to_string(),
        source,
    })
}

macro_rules! backend_methods {
    ($($(#[$meta:meta])* $ty:ident => $name:literal ($params:ty) -> $output:ty;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy)]
            pub struct $ty;

            impl sealed::Sealed for $ty {}

            impl BackendMethod for $ty {
                const NAME: &'static str = $name;
                type Params = $params;
                type Output = $output;
            }
        )*

        /// Wire names of every catalogued method
        pub const ALL_METHODS: &[&str] = &[$($name),*];
    };
}

backend_methods! {
    CreateSubsystem => "create_subsystem" (CreateSubsystemParams) -> StatusResult;
    DeleteSubsystem => "delete_subsystem" (SubsystemParams) -> StatusResult;
    GetSubsystemList => "get_subsys_list" (()) -> SubsystemListResult;
    SubsystemGetInfo => "subsys_get_info" (SubsystemParams) -> SubsystemInfoResult;
    /// Firmware and version query
    GetVersion => "get_version" (()) -> VersionResult;

    /// Also used to update an existing controller
    SubsystemCreateController => "subsys_create_ctrlr" (CreateControllerParams) -> CreateControllerResult;
    SubsystemRemoveController => "subsys_remove_ctrlr" (RemoveControllerParams) -> StatusResult;
    SubsystemGetControllerList => "subsys_get_ctrlr_list" (SubsystemParams) -> ControllerListResult;
    ControllerGetInfo => "ctrlr_get_info" (ControllerParams) -> ControllerInfoResult;
    ControllerGetStats => "ctrlr_get_stats" (ControllerParams) -> IoStatsResult;

    SubsystemAllocNamespace => "subsys_alloc_ns" (AllocNamespaceParams) -> StatusResult;
    SubsystemUnallocNamespace => "subsys_unalloc_ns" (NamespaceParams) -> StatusResult;
    SubsystemGetNamespaceList => "subsys_get_ns_list" (SubsystemParams) -> NamespaceListResult;
    NamespaceGetInfo => "ns_get_info" (NamespaceParams) -> NamespaceInfoResult;
    NamespaceGetStats => "ns_get_stats" (NamespaceParams) -> IoStatsResult;
    ControllerAttachNamespace => "ctrlr_attach_ns" (AttachNamespaceParams) -> StatusResult;
    ControllerDetachNamespace => "ctrlr_detach_ns" (AttachNamespaceParams) -> StatusResult;
}

macro_rules! impl_has_status {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasStatus for $ty {
                fn status(&self) -> i32 {
                    self.status
                }
            }
        )*
    };
}

impl_has_status!(
    StatusResult,
    SubsystemListResult,
    SubsystemInfoResult,
    VersionResult,
    CreateControllerResult,
    ControllerListResult,
    ControllerInfoResult,
    IoStatsResult,
    NamespaceListResult,
    NamespaceInfoResult,
);

// Parameters

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSubsystemParams {
    pub subnqn: String,
    pub mn: String,
    pub sn: String,
    pub num_ns: i64,
    pub min_ctrlr_id: u32,
    pub max_ctrlr_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemParams {
    pub subnqn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateControllerParams {
    pub subnqn: String,
    pub pcie_domain_id: i32,
    pub pf_id: i32,
    pub vf_id: i32,
    pub ctrlr_id: i32,
    pub max_nsq: i32,
    pub max_ncq: i32,
    pub mqes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveControllerParams {
    pub subnqn: String,
    pub ctrlr_id: i32,
    pub force: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerParams {
    pub subnqn: String,
    pub ctrlr_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocNamespaceParams {
    pub subnqn: String,
    pub nguid: String,
    pub eui64: i64,
    pub uuid: String,
    pub shared_enable: u32,
    pub bdev: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceParams {
    pub subnqn: String,
    pub nsid: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachNamespaceParams {
    pub subnqn: String,
    pub ctrlr_id: i32,
    pub nsid: i32,
}

// Results

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResult {
    pub status: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsystemListResult {
    pub status: i32,
    #[serde(default)]
    pub subsys_list: Vec<SubsystemListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsystemListEntry {
    pub subnqn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsystemInfoResult {
    pub status: i32,
    #[serde(default)]
    pub mn: String,
    #[serde(default)]
    pub sn: String,
    #[serde(default)]
    pub num_ns: i64,
    #[serde(default)]
    pub num_total_ctrlr: i64,
    #[serde(default)]
    pub num_active_ctrlr: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionResult {
    pub status: i32,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateControllerResult {
    pub status: i32,
    #[serde(default)]
    pub ctrlr_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerListResult {
    pub status: i32,
    #[serde(default)]
    pub ctrlr_id_list: Vec<ControllerListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerListEntry {
    pub ctrlr_id: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerInfoResult {
    pub status: i32,
    #[serde(default)]
    pub ctrlr_id: i32,
    #[serde(default)]
    pub pcie_domain_id: i32,
    #[serde(default)]
    pub pf_id: i32,
    #[serde(default)]
    pub vf_id: i32,
    #[serde(default)]
    pub max_nsq: i32,
    #[serde(default)]
    pub max_ncq: i32,
    #[serde(default)]
    pub mqes: i32,
    #[serde(default)]
    pub num_ns: i32,
}

/// Counters shared by controller and namespace stats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoStatsResult {
    pub status: i32,
    #[serde(default)]
    pub num_read_bytes: i64,
    #[serde(default)]
    pub num_read_cmds: i64,
    #[serde(default)]
    pub num_write_bytes: i64,
    #[serde(default)]
    pub num_write_cmds: i64,
    #[serde(default)]
    pub total_read_latency_in_us: i64,
    #[serde(default)]
    pub total_write_latency_in_us: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceListResult {
    pub status: i32,
    #[serde(default)]
    pub ns_list: Vec<NamespaceListEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceListEntry {
    pub nsid: i32,
    #[serde(default)]
    pub bdev: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceInfoResult {
    pub status: i32,
    #[serde(default)]
    pub nsid: i32,
    #[serde(default)]
    pub bdev: String,
    #[serde(default)]
    pub nguid: String,
    #[serde(default)]
    pub eui64: i64,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub num_ctrlrs: i32,
}
