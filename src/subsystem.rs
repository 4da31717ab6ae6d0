//! Subsystem operations

use bridge_common::{
    bail, BridgeError, CreateNvmeSubsystemRequest, DeleteRequest, GetRequest, ListNvmeSubsystemsResponse,
    ListRequest, NvmeSubsystem, NvmeSubsystemSpec, NvmeSubsystemStatus, Result, StatsRequest,
    StatsResponse, UpdateNvmeSubsystemRequest, VolumeStats, PLACEHOLDER_FIRMWARE_REVISION,
};
use bridge_jsonrpc::methods::{
    CreateSubsystem, CreateSubsystemParams, DeleteSubsystem, GetSubsystemList, GetVersion, SubsystemGetInfo,
    SubsystemParams,
};
use bridge_jsonrpc::HasStatus;
use tracing::{error, info, instrument, warn};

use crate::naming::{self, ResourceKind};
use crate::{require, validate_update_mask, NvmeBridge};

impl NvmeBridge {
    /// Create a subsystem, or return the stored one if the name is taken
    #[instrument(skip(self, request), fields(id = %request.id))]
    pub async fn create_nvme_subsystem(&self, request: CreateNvmeSubsystemRequest) -> Result<NvmeSubsystem> {
        let Some(mut subsystem) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_subsystem");
        };
        require(&subsystem.spec.nqn, "nvme_subsystem.spec.nqn")?;
        let name = naming::new_name(ResourceKind::Subsystem, None, &request.id)?;
        let nqn = subsystem.spec.nqn.clone();

        let _guard = self.mutations.lock().await;

        let existing = self.store.read().subsystems.get(&name).cloned();
        if let Some(existing) = existing {
            info!(%name, "subsystem already exists");
            return Ok(existing);
        }
        if self.store.read().nqn_in_use(&nqn) {
            bail!(AlreadyExists, "NQN {} already exists", nqn);
        }

        let params = CreateSubsystemParams {
            subnqn: nqn.clone(),
            mn: subsystem.spec.model_number.clone(),
            sn: subsystem.spec.serial_number.clone(),
            num_ns: subsystem.spec.max_namespaces,
            min_ctrlr_id: self.config.backend.min_ctrlr_id,
            max_ctrlr_id: self.config.backend.max_ctrlr_id,
        };
        let result = self.call::<CreateSubsystem>(params).await?;
        if !result.is_success() {
            error!(%nqn, status = result.status, "backend refused to create subsystem");
            bail!(InvalidArgument, "Could not create NQN: {}", nqn);
        }

        let version = self.call::<GetVersion>(()).await?;
        if !version.is_success() {
            warn!(%nqn, status = version.status, "version query reported failure");
        }

        subsystem.name = name.clone();
        subsystem.status = NvmeSubsystemStatus {
            firmware_revision: version.version,
        };
        self.store.write().subsystems.insert(name.clone(), subsystem.clone());

        info!(%name, %nqn, "created subsystem");
        Ok(subsystem)
    }

    /// Delete a subsystem.
    ///
    /// Only the subsystem itself is removed; controllers and namespaces that
    /// still name it are left in place.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn delete_nvme_subsystem(&self, request: DeleteRequest) -> Result<()> {
        require(&request.name, "name")?;

        let _guard = self.mutations.lock().await;

        let subsystem = self.store.read().subsystems.get(&request.name).cloned();
        let Some(subsystem) = subsystem else {
            if request.allow_missing {
                info!("subsystem already absent");
                return Ok(());
            }
            return Err(BridgeError::not_found(&request.name));
        };
        let nqn = subsystem.spec.nqn;

        let result = self
            .call::<DeleteSubsystem>(SubsystemParams { subnqn: nqn.clone() })
            .await?;
        if !result.is_success() {
            error!(%nqn, status = result.status, "backend refused to delete subsystem");
            bail!(InvalidArgument, "Could not delete NQN: {}", nqn);
        }

        self.store.write().subsystems.remove(&request.name);
        info!(%nqn, "deleted subsystem");
        Ok(())
    }

    /// Subsystems cannot be modified after creation
    #[instrument(skip(self, request))]
    pub async fn update_nvme_subsystem(&self, request: UpdateNvmeSubsystemRequest) -> Result<NvmeSubsystem> {
        let Some(subsystem) = request.resource else {
            bail!(InvalidArgument, "missing required field: nvme_subsystem");
        };
        require(&subsystem.name, "nvme_subsystem.name")?;
        validate_update_mask::<NvmeSubsystem>(request.update_mask.as_deref())?;

        if !self.store.read().subsystems.contains_key(&subsystem.name) {
            return Err(BridgeError::not_found(&subsystem.name));
        }

        bail!(Unimplemented, "UpdateNvmeSubsystem method is not implemented");
    }

    /// List subsystems known to the backend, ordered by NQN.
    ///
    /// Entries only carry the NQN.
    #[instrument(skip(self, request))]
    pub async fn list_nvme_subsystems(&self, request: ListRequest) -> Result<ListNvmeSubsystemsResponse> {
        let (size, offset) = self.extract_pagination(request.page_size, &request.page_token)?;

        let result = self.call::<GetSubsystemList>(()).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to list subsystems");
            bail!(InvalidArgument, "Could not list subsystems");
        }

        let mut items: Vec<NvmeSubsystem> = result
            .subsys_list
            .into_iter()
            .map(|entry| NvmeSubsystem {
                spec: NvmeSubsystemSpec {
                    nqn: entry.subnqn,
                    ..NvmeSubsystemSpec::default()
                },
                ..NvmeSubsystem::default()
            })
            .collect();
        items.sort_by(|a, b| a.spec.nqn.cmp(&b.spec.nqn));

        let (items, next_page_token) = self.paginate(items, size, offset);
        Ok(ListNvmeSubsystemsResponse { items, next_page_token })
    }

    /// Confirm a stored subsystem still exists on the backend
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn get_nvme_subsystem(&self, request: GetRequest) -> Result<NvmeSubsystem> {
        require(&request.name, "name")?;

        let subsystem = self.store.read().subsystems.get(&request.name).cloned();
        let Some(subsystem) = subsystem else {
            return Err(BridgeError::not_found(&request.name));
        };
        let nqn = subsystem.spec.nqn;

        let result = self.call::<GetSubsystemList>(()).await?;
        if !result.is_success() {
            error!(status = result.status, "backend refused to list subsystems");
            bail!(InvalidArgument, "Could not list subsystems");
        }

        if !result.subsys_list.iter().any(|entry| entry.subnqn == nqn) {
            warn!(%nqn, "stored subsystem missing from backend");
            bail!(InvalidArgument, "Could not find NQN: {}", nqn);
        }

        Ok(NvmeSubsystem {
            name: request.name,
            spec: NvmeSubsystemSpec {
                nqn,
                ..NvmeSubsystemSpec::default()
            },
            status: NvmeSubsystemStatus {
                firmware_revision: PLACEHOLDER_FIRMWARE_REVISION.to_string(),
            },
        })
    }

    /// Subsystem stats.
    ///
    /// The backend query only has to succeed; the counters are fixed at -1.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn stats_nvme_subsystem(&self, request: StatsRequest) -> Result<StatsResponse> {
        require(&request.name, "name")?;

        let subsystem = self.store.read().subsystems.get(&request.name).cloned();
        let Some(subsystem) = subsystem else {
            return Err(BridgeError::not_found(&request.name));
        };
        let nqn = subsystem.spec.nqn;

        let result = self
            .call::<SubsystemGetInfo>(SubsystemParams { subnqn: nqn.clone() })
            .await?;
        if !result.is_success() {
            error!(%nqn, status = result.status, "backend refused subsystem info");
            bail!(InvalidArgument, "Could not stats NQN: {}", nqn);
        }

        Ok(StatsResponse {
            stats: VolumeStats {
                read_bytes_count: -1,
                read_ops_count: -1,
                ..VolumeStats::default()
            },
        })
    }
}
