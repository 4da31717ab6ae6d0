//! Namespace operations.
//!
//! A namespace is attached to every controller of its subsystem when it is
//! created and detached from all of them before it is released. Both loops
//! run one controller at a time and stop at the first failure without
//! undoing the steps already taken on the backend.

use bridge_common::{
    bail, BridgeError, CreateNvmeNamespaceRequest, DeleteRequest, GetRequest, ListNvmeNamespacesResponse,
    ListRequest, NamespacePciOperState, NamespacePciState, NvmeNamespace, NvmeNamespaceSpec, NvmeNamespaceStatus,
    NvmeSubsystem, Result, StatsRequest, StatsResponse, UpdateNvmeNamespaceRequest, VolumeStats,
};
use bridge_jsonrpc::methods::{
    AllocNamespaceParams, AttachNamespaceParams, ControllerAttachNamespace, ControllerDetachNamespace,
    NamespaceGetInfo, NamespaceGetStats, NamespaceParams, SubsystemAllocNamespace, SubsystemGetNamespaceList,
    SubsystemParams, SubsystemUnallocNamespace,
};
use bridge_jsonrpc::HasStatus;
use tracing::{debug, error, info, instrument, warn};

use crate::naming::{self, ResourceKind};
use crate::{require, validate_update_mask, NvmeBridge};

/// Status reported for a namespace that is attached everywhere
const ACTIVE_STATUS: NvmeNamespaceStatus = NvmeNamespaceStatus {
    pci_state: NamespacePciState::Enabled,
    pci_oper_state: NamespacePciOperState::Online,
};

impl NvmeBridge {
    /// Allocate a namespace and attach it to every controller of its subsystem
    #[instrument(skip(self, request), fields(parent = %request.parent, id = %request.id))]
    pub async fn create_nvme_namespace(&self, request: CreateNvmeNamespaceRequest) -> Result<NvmeNamespace> {
        let Some(mut namespace) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_namespace");
        };
        require(&request.parent, "parent")?;
        require(&namespace.spec.volume_name_ref, "nvme_namespace.spec.volume_name_ref")?;
        let subsystem_id = naming::subsystem_id(&request.parent)?;
        let name = naming::new_name(ResourceKind::Namespace, Some(subsystem_id), &request.id)?;

        let _guard = self.mutations.lock().await;

        let existing = self.store.read().namespaces.get(&name).cloned();
        if let Some(existing) = existing {
            info!(%name, "namespace already exists");
            return Ok(existing);
        }
        let subsystem = self.lookup_subsystem(&request.parent)?;
        let nqn = subsystem.spec.nqn.clone();

        let params = AllocNamespaceParams {
            subnqn: nqn.clone(),
            nguid: namespace.spec.nguid.clone(),
            eui64: namespace.spec.eui64,
            uuid: namespace.spec.uuid.clone(),
            shared_enable: 1,
            bdev: namespace.spec.volume_name_ref.clone(),
        };
        let result = self.call::<SubsystemAllocNamespace>(params).await?;
        if !result.is_success() {
            error!(%nqn, status = result.status, "backend refused to allocate namespace");
            bail!(InvalidArgument, "Could not create NS: {}", name);
        }

        let controllers = self.store.read().controllers_of(subsystem_id);
        for controller in &controllers {
            let params = AttachNamespaceParams {
                subnqn: nqn.clone(),
                ctrlr_id: self.ctrlr_id(controller),
                nsid: namespace.spec.host_nsid,
            };
            debug!(controller = %controller.name, "attaching namespace");
            let result = self.call::<ControllerAttachNamespace>(params).await?;
            if !result.is_success() {
                warn!(
                    controller = %controller.name,
                    status = result.status,
                    "attach failed, namespace left allocated"
                );
                bail!(InvalidArgument, "Could not attach NS: {}", name);
            }
        }

        namespace.name = name.clone();
        namespace.status = ACTIVE_STATUS;
        self.store.write().namespaces.insert(name.clone(), namespace.clone());

        info!(%name, attached = controllers.len(), "created namespace");
        Ok(namespace)
    }

    /// Detach a namespace from every controller, then release it
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn delete_nvme_namespace(&self, request: DeleteRequest) -> Result<()> {
        require(&request.name, "name")?;

        let _guard = self.mutations.lock().await;

        let namespace = self.store.read().namespaces.get(&request.name).cloned();
        let Some(namespace) = namespace else {
            if request.allow_missing {
                info!("namespace already absent");
                return Ok(());
            }
            return Err(BridgeError::not_found(&request.name));
        };
        let subsystem = self.parent_of(&namespace.name)?;
        let nqn = subsystem.spec.nqn.clone();
        let nsid = namespace.spec.host_nsid;

        let controllers = match naming::parent_subsystem_id(&namespace.name) {
            Some(subsystem_id) => self.store.read().controllers_of(subsystem_id),
            None => Vec::new(),
        };
        for controller in &controllers {
            let params = AttachNamespaceParams {
                subnqn: nqn.clone(),
                ctrlr_id: self.ctrlr_id(controller),
                nsid,
            };
            debug!(controller = %controller.name, "detaching namespace");
            let result = self.call::<ControllerDetachNamespace>(params).await?;
            if !result.is_success() {
                warn!(controller = %controller.name, status = result.status, "detach failed");
                bail!(InvalidArgument, "Could not detach NS: {}", request.name);
            }
        }

        let result = self
            .call::<SubsystemUnallocNamespace>(NamespaceParams { subnqn: nqn, nsid })
            .await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to release namespace");
            bail!(InvalidArgument, "Could not delete NS: {}", request.name);
        }

        self.store.write().namespaces.remove(&request.name);
        info!(detached = controllers.len(), "deleted namespace");
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn update_nvme_namespace(&self, request: UpdateNvmeNamespaceRequest) -> Result<NvmeNamespace> {
        let Some(namespace) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_namespace");
        };
        require(&namespace.name, "nvme_namespace.name")?;
        validate_update_mask::<NvmeNamespace>(request.update_mask.as_deref())?;

        if !self.store.read().namespaces.contains_key(&namespace.name) {
            return Err(BridgeError::not_found(&namespace.name));
        }

        bail!(Unimplemented, "UpdateNvmeNamespace method is not implemented");
    }

    /// List the namespaces the backend reports for a subsystem, ordered by
    /// host namespace id
    #[instrument(skip(self, request), fields(parent = %request.parent))]
    pub async fn list_nvme_namespaces(&self, request: ListRequest) -> Result<ListNvmeNamespacesResponse> {
        require(&request.parent, "parent")?;
        let subsystem = self.lookup_subsystem(&request.parent)?;
        let subsystem_id = naming::subsystem_id(&request.parent)?;
        let (size, offset) = self.extract_pagination(request.page_size, &request.page_token)?;

        let params = SubsystemParams {
            subnqn: subsystem.spec.nqn,
        };
        let result = self.call::<SubsystemGetNamespaceList>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to list namespaces");
            bail!(InvalidArgument, "Could not list NS: {}", request.parent);
        }

        let known = self.store.read().namespaces_of(subsystem_id);
        let mut items: Vec<NvmeNamespace> = result
            .ns_list
            .into_iter()
            .map(|entry| {
                let name = known
                    .iter()
                    .find(|n| n.spec.host_nsid == entry.nsid)
                    .map(|n| n.name.clone())
                    .unwrap_or_default();
                NvmeNamespace {
                    name,
                    spec: NvmeNamespaceSpec {
                        host_nsid: entry.nsid,
                        volume_name_ref: entry.bdev,
                        ..NvmeNamespaceSpec::default()
                    },
                    ..NvmeNamespace::default()
                }
            })
            .collect();
        items.sort_by_key(|n| n.spec.host_nsid);

        let (items, next_page_token) = self.paginate(items, size, offset);
        Ok(ListNvmeNamespacesResponse { items, next_page_token })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn get_nvme_namespace(&self, request: GetRequest) -> Result<NvmeNamespace> {
        require(&request.name, "name")?;
        let (namespace, subsystem) = self.lookup_namespace(&request.name)?;

        let params = NamespaceParams {
            subnqn: subsystem.spec.nqn,
            nsid: namespace.spec.host_nsid,
        };
        let result = self.call::<NamespaceGetInfo>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused namespace info");
            bail!(InvalidArgument, "Could not get NS: {}", request.name);
        }

        Ok(NvmeNamespace {
            name: request.name,
            spec: NvmeNamespaceSpec {
                nguid: result.nguid,
                ..NvmeNamespaceSpec::default()
            },
            status: ACTIVE_STATUS,
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn stats_nvme_namespace(&self, request: StatsRequest) -> Result<StatsResponse> {
        require(&request.name, "name")?;
        let (namespace, subsystem) = self.lookup_namespace(&request.name)?;

        let params = NamespaceParams {
            subnqn: subsystem.spec.nqn,
            nsid: namespace.spec.host_nsid,
        };
        let result = self.call::<NamespaceGetStats>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused namespace stats");
            bail!(InvalidArgument, "Could not stats NS: {}", request.name);
        }

        Ok(StatsResponse {
            stats: VolumeStats {
                read_bytes_count: result.num_read_bytes,
                read_ops_count: result.num_read_cmds,
                write_bytes_count: result.num_write_bytes,
                write_ops_count: result.num_write_cmds,
                read_latency_ticks: result.total_read_latency_in_us,
                write_latency_ticks: result.total_write_latency_in_us,
            },
        })
    }

    fn lookup_namespace(&self, name: &str) -> Result<(NvmeNamespace, NvmeSubsystem)> {
        let namespace = self.store.read().namespaces.get(name).cloned();
        let Some(namespace) = namespace else {
            return Err(BridgeError::not_found(name));
        };
        let subsystem = self.parent_of(&namespace.name)?;
        Ok((namespace, subsystem))
    }
}
