use bridge_common::{
    bail, BridgeError, CreateNvmeControllerRequest, DeleteRequest, GetRequest, ListNvmeControllersResponse,
    ListRequest, NvmeController, NvmeControllerSpec, NvmeControllerStatus, NvmeSubsystem, Result, StatsRequest,
    StatsResponse, UpdateNvmeControllerRequest, VolumeStats,
};
use bridge_jsonrpc::methods::{
    ControllerGetInfo, ControllerGetStats, ControllerParams, CreateControllerParams, RemoveControllerParams,
    SubsystemCreateController, SubsystemGetControllerList, SubsystemParams, SubsystemRemoveController,
};
use bridge_jsonrpc::HasStatus;
use tracing::{error, info, instrument};

use crate::naming::{self, ResourceKind};
use crate::{require, validate_update_mask, NvmeBridge};

impl NvmeBridge {
    #[instrument(skip(self, request), fields(parent = %request.parent, id = %request.id))]
    pub async fn create_nvme_controller(&self, request: CreateNvmeControllerRequest) -> Result<NvmeController> {
        let Some(mut controller) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_controller");
        };
        require(&request.parent, "parent")?;
        let subsystem_id = naming::subsystem_id(&request.parent)?;
        let name = naming::new_name(ResourceKind::Controller, Some(subsystem_id), &request.id)?;

        let _guard = self.mutations.lock().await;

        let existing = self.store.read().controllers.get(&name).cloned();
        if let Some(existing) = existing {
            info!(%name, "controller already exists");
            return Ok(existing);
        }
        let subsystem = self.lookup_subsystem(&request.parent)?;

        controller.name = name.clone();
        let ctrlr_id = self.issue_create_controller(&subsystem, &controller).await?;
        let Some(ctrlr_id) = ctrlr_id else {
            bail!(InvalidArgument, "Could not create CTRL: {}", name);
        };

        controller.spec.nvme_controller_id = Some(ctrlr_id);
        controller.status = NvmeControllerStatus { active: true };
        self.store.write().controllers.insert(name.clone(), controller.clone());

        info!(%name, ctrlr_id, "created controller");
        Ok(controller)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn delete_nvme_controller(&self, request: DeleteRequest) -> Result<()> {
        require(&request.name, "name")?;

        let _guard = self.mutations.lock().await;

        let controller = self.store.read().controllers.get(&request.name).cloned();
        let Some(controller) = controller else {
            if request.allow_missing {
                info!("controller already absent");
                return Ok(());
            }
            return Err(BridgeError::not_found(&request.name));
        };
        let subsystem = self.parent_of(&controller.name)?;

        let params = RemoveControllerParams {
            subnqn: subsystem.spec.nqn,
            ctrlr_id: self.ctrlr_id(&controller),
            force: 1,
        };
        let result = self.call::<SubsystemRemoveController>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to remove controller");
            bail!(InvalidArgument, "Could not delete CTRL: {}", request.name);
        }

        self.store.write().controllers.remove(&request.name);
        info!("deleted controller");
        Ok(())
    }

    /// Re-issue controller creation with the new spec.
    ///
    /// The backend has no separate update call.
    #[instrument(skip(self, request))]
    pub async fn update_nvme_controller(&self, request: UpdateNvmeControllerRequest) -> Result<NvmeController> {
        let Some(mut controller) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_controller");
        };
        require(&controller.name, "nvme_controller.name")?;
        validate_update_mask::<NvmeController>(request.update_mask.as_deref())?;

        let _guard = self.mutations.lock().await;

        let stored = self.store.read().controllers.get(&controller.name).cloned();
        let Some(stored) = stored else {
            return Err(BridgeError::not_found(&controller.name));
        };
        let subsystem = self.parent_of(&stored.name)?;

        if controller.spec.nvme_controller_id.is_none() {
            controller.spec.nvme_controller_id = stored.spec.nvme_controller_id;
        }
        let Some(ctrlr_id) = self.issue_create_controller(&subsystem, &controller).await? else {
            bail!(InvalidArgument, "Could not update CTRL: {}", controller.name);
        };

        controller.spec.nvme_controller_id = Some(ctrlr_id);
        controller.status = NvmeControllerStatus { active: true };
        self.store
            .write()
            .controllers
            .insert(controller.name.clone(), controller.clone());

        info!(name = %controller.name, ctrlr_id, "updated controller");
        Ok(controller)
    }

    /// List the controllers the backend reports for a subsystem, ordered by
    /// controller id
    #[instrument(skip(self, request), fields(parent = %request.parent))]
    pub async fn list_nvme_controllers(&self, request: ListRequest) -> Result<ListNvmeControllersResponse> {
        require(&request.parent, "parent")?;
        let subsystem = self.lookup_subsystem(&request.parent)?;
        let subsystem_id = naming::subsystem_id(&request.parent)?;
        let (size, offset) = self.extract_pagination(request.page_size, &request.page_token)?;

        let params = SubsystemParams {
            subnqn: subsystem.spec.nqn,
        };
        let result = self.call::<SubsystemGetControllerList>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to list controllers");
            bail!(InvalidArgument, "Could not list CTRLs: {}", request.parent);
        }

        let known = self.store.read().controllers_of(subsystem_id);
        let mut items: Vec<NvmeController> = result
            .ctrlr_id_list
            .into_iter()
            .map(|entry| {
                let name = known
                    .iter()
                    .find(|c| c.spec.nvme_controller_id == Some(entry.ctrlr_id))
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                NvmeController {
                    name,
                    spec: NvmeControllerSpec {
                        nvme_controller_id: Some(entry.ctrlr_id),
                        ..NvmeControllerSpec::default()
                    },
                    ..NvmeController::default()
                }
            })
            .collect();
        items.sort_by_key(|c| c.spec.nvme_controller_id);

        let (items, next_page_token) = self.paginate(items, size, offset);
        Ok(ListNvmeControllersResponse { items, next_page_token })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn get_nvme_controller(&self, request: GetRequest) -> Result<NvmeController> {
        require(&request.name, "name")?;
        let (controller, subsystem) = self.lookup_controller(&request.name)?;

        let params = ControllerParams {
            subnqn: subsystem.spec.nqn,
            ctrlr_id: self.ctrlr_id(&controller),
        };
        let result = self.call::<ControllerGetInfo>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused controller info");
            bail!(InvalidArgument, "Could not get CTRL: {}", request.name);
        }

        Ok(NvmeController {
            name: request.name,
            spec: NvmeControllerSpec {
                nvme_controller_id: Some(result.ctrlr_id),
                ..NvmeControllerSpec::default()
            },
            status: NvmeControllerStatus { active: true },
        })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn stats_nvme_controller(&self, request: StatsRequest) -> Result<StatsResponse> {
        require(&request.name, "name")?;
        let (controller, subsystem) = self.lookup_controller(&request.name)?;

        let params = ControllerParams {
            subnqn: subsystem.spec.nqn,
            ctrlr_id: self.ctrlr_id(&controller),
        };
        let result = self.call::<ControllerGetStats>(params).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused controller stats");
            bail!(InvalidArgument, "Could not stats CTRL: {}", request.name);
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

    /// Send `subsys_create_ctrlr` for `controller`, returning the id the
    /// backend assigned, or `None` when it reported failure
    async fn issue_create_controller(
        &self,
        subsystem: &NvmeSubsystem,
        controller: &NvmeController,
    ) -> Result<Option<i32>> {
        let spec = &controller.spec;
        let params = CreateControllerParams {
            subnqn: subsystem.spec.nqn.clone(),
            pcie_domain_id: spec.pcie_id.port_id,
            pf_id: spec.pcie_id.physical_function,
            vf_id: spec.pcie_id.virtual_function,
            ctrlr_id: self.ctrlr_id(controller),
            max_nsq: spec.max_nsq,
            max_ncq: spec.max_ncq,
            mqes: spec.mqes,
        };
        let result = self.call::<SubsystemCreateController>(params).await?;
        if !result.is_success() {
            error!(name = %controller.name, status = result.status, "backend refused controller");
            return Ok(None);
        }
        Ok(Some(result.ctrlr_id))
    }

    /// Requested controller id, or the configured auto-assign value
    pub(crate) fn ctrlr_id(&self, controller: &NvmeController) -> i32 {
        controller
            .spec
            .nvme_controller_id
            .unwrap_or(self.config.backend.auto_ctrlr_id)
    }

    fn lookup_controller(&self, name: &str) -> Result<(NvmeController, NvmeSubsystem)> {
        let controller = self.store.read().controllers.get(name).cloned();
        let Some(controller) = controller else {
            return Err(BridgeError::not_found(name));
        };
        let subsystem = self.parent_of(&controller.name)?;
        Ok((controller, subsystem))
    }
}
