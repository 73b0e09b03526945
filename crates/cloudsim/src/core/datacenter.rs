//! Datacenter component which owns hosts and runs VMs.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::json;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::{Event, EventId};
use simcore::handler::EventHandler;
use simcore::{log_debug, log_error, log_info, log_trace, log_warn};

use crate::core::allocation_policy::{Migration, VmAllocationPolicy};
use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_scheduler::CloudletScheduler;
use crate::core::config::SimulationConfig;
use crate::core::error::CloudError;
use crate::core::events::broker::{
    CloudletCancel, CloudletPause, CloudletResume, CloudletSubmit, VmCreateRequest, VmDestroyRequest,
};
use crate::core::events::datacenter::{CloudletReturn, VmCreateAck, VmDestroyed};
use crate::core::events::processing::{OptimizeAllocation, UpdateProcessing, VmMigrationComplete};
use crate::core::host::{Host, HostSpec};
use crate::core::vm::{Vm, VmSpec, VmStatus};

/// Datacenter places VMs requested by brokers on its hosts and drives the processing of their cloudlets.
///
/// Processing of all hosts is updated whenever the set of executing cloudlets changes, when some cloudlet is
/// expected to complete and periodically with the configured scheduling interval while some VM has executing
/// or waiting cloudlets. The periodic update also invokes allocation optimization of the VM allocation policy
/// and starts the planned migrations.
///
/// A migrating VM keeps running on the source host while its resources are reserved on the target host.
/// Migration takes the time needed to transfer the VM memory over the configured share of the source
/// host bandwidth.
pub struct Datacenter {
    pub id: u32,
    hosts: Vec<Host>,
    vms: BTreeMap<u32, Vm>,
    allocation_policy: Box<dyn VmAllocationPolicy>,
    next_update: Option<(f64, EventId)>,
    optimization_scheduled: bool,
    migrations: BTreeMap<u32, EventId>,
    migration_count: u32,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        allocation_policy: Box<dyn VmAllocationPolicy>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            hosts: Vec::new(),
            vms: BTreeMap::new(),
            allocation_policy,
            next_update: None,
            optimization_scheduled: false,
            migrations: BTreeMap::new(),
            migration_count: 0,
            ctx,
            sim_config,
        }
    }

    /// Adds host and returns its id, which is the host position in the host list.
    pub fn add_host(&mut self, spec: HostSpec) -> u32 {
        let id = self.hosts.len() as u32;
        log_debug!(self.ctx, "added host {}: {}", id, json!(spec));
        self.hosts.push(Host::new(id, spec));
        id
    }

    pub fn set_allocation_policy(&mut self, allocation_policy: Box<dyn VmAllocationPolicy>) {
        self.allocation_policy = allocation_policy;
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(host_id as usize)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&vm_id)
    }

    pub fn vm_ids(&self) -> Vec<u32> {
        self.vms.keys().copied().collect()
    }

    /// Number of completed migrations.
    pub fn migration_count(&self) -> u32 {
        self.migration_count
    }

    fn has_busy_vms(&self) -> bool {
        self.vms
            .values()
            .any(|vm| vm.status() != VmStatus::Destroyed && vm.scheduler().is_busy())
    }

    /// Advances all hosts to the current time, returns finished cloudlets to brokers and
    /// schedules the next update at the earliest expected cloudlet completion.
    fn update_processing(&mut self) {
        let time = self.ctx.time();
        let mut next_event: Option<f64> = None;
        for host in self.hosts.iter_mut() {
            if let Some(t) = host.update_processing(time, &mut self.vms) {
                next_event = Some(next_event.map_or(t, |n| n.min(t)));
            }
        }

        let mut finished = Vec::new();
        for vm in self.vms.values_mut() {
            finished.extend(vm.scheduler_mut().take_finished());
        }
        for cloudlet in finished {
            log_debug!(self.ctx, "cloudlet {} finished on vm {}", cloudlet.id, cloudlet.vm_id);
            self.return_cloudlet(cloudlet);
        }

        self.schedule_update(next_event);
    }

    fn schedule_update(&mut self, next_event: Option<f64>) {
        let time = self.ctx.time();
        let next_event = next_event.map(|t| t.max(time + self.sim_config.min_time_between_events));
        if let Some((pending_time, _)) = self.next_update {
            if Some(pending_time) == next_event {
                return;
            }
        }
        if let Some((_, event_id)) = self.next_update.take() {
            self.ctx.cancel_event(event_id);
        }
        if let Some(t) = next_event {
            let event_id = self.ctx.emit_self(UpdateProcessing {}, t - time);
            self.next_update = Some((t, event_id));
        }
    }

    /// Keeps periodic optimization running while some VM has work to do.
    fn schedule_optimization(&mut self) {
        if !self.optimization_scheduled && self.has_busy_vms() {
            self.ctx
                .emit_self(OptimizeAllocation {}, self.sim_config.scheduling_interval);
            self.optimization_scheduled = true;
        }
    }

    fn return_cloudlet(&mut self, cloudlet: Cloudlet) {
        let broker = cloudlet.broker;
        self.ctx.emit_now(CloudletReturn { cloudlet }, broker);
    }

    fn fail_cloudlet(&mut self, mut cloudlet: Cloudlet) {
        cloudlet.reject(self.ctx.time());
        self.return_cloudlet(cloudlet);
    }

    fn on_vm_create_request(&mut self, spec: VmSpec, broker: u32) {
        let time = self.ctx.time();
        let vm_id = spec.id;
        if self.vms.contains_key(&vm_id) {
            log_warn!(self.ctx, "vm {} already exists", vm_id);
            self.ctx.emit_now(VmCreateAck { vm_id, host_id: None }, broker);
            return;
        }

        let mut vm = Vm::new(spec, broker, time);
        match self
            .allocation_policy
            .allocate_host_for_vm(&mut vm, &mut self.hosts, time)
        {
            Ok(host_id) => {
                log_debug!(self.ctx, "vm {} created on host {}", vm_id, host_id);
                vm.update_processing(time);
                self.vms.insert(vm_id, vm);
                self.ctx.emit_now(
                    VmCreateAck {
                        vm_id,
                        host_id: Some(host_id),
                    },
                    broker,
                );
            }
            Err(CloudError::PlacementFailure { .. }) => {
                log_debug!(self.ctx, "failed to place vm {}", vm_id);
                self.ctx.emit_now(VmCreateAck { vm_id, host_id: None }, broker);
            }
            Err(e) => {
                log_error!(self.ctx, "allocation of vm {} failed: {}", vm_id, e);
                panic!("{}", e);
            }
        }
    }

    fn on_vm_destroy_request(&mut self, vm_id: u32) {
        let time = self.ctx.time();
        self.update_processing();
        let vm = match self.vms.get_mut(&vm_id) {
            Some(vm) if vm.status() != VmStatus::Destroyed => vm,
            _ => {
                log_warn!(self.ctx, "cannot destroy unknown vm {}", vm_id);
                return;
            }
        };
        let failed = vm.scheduler_mut().cloudlet_fail_all(time);
        if let Some(event_id) = self.migrations.remove(&vm_id) {
            self.ctx.cancel_event(event_id);
        }
        self.allocation_policy.deallocate_host_for_vm(vm, &mut self.hosts);
        vm.destroy(time);
        let broker = vm.broker;
        log_debug!(self.ctx, "vm {} destroyed, {} cloudlets failed", vm_id, failed.len());

        for cloudlet in failed {
            self.return_cloudlet(cloudlet);
        }
        self.ctx.emit_now(VmDestroyed { vm_id }, broker);
        self.update_processing();
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet, broker: u32) {
        let time = self.ctx.time();
        cloudlet.broker = broker;
        self.update_processing();
        let vm = match self.vms.get_mut(&cloudlet.vm_id) {
            Some(vm) if vm.status() != VmStatus::Destroyed => vm,
            _ => {
                log_warn!(self.ctx, "cloudlet {} submitted to unknown vm {}", cloudlet.id, cloudlet.vm_id);
                self.fail_cloudlet(cloudlet);
                return;
            }
        };
        let cloudlet_id = cloudlet.id;
        let submitted = cloudlet.clone();
        match vm.scheduler_mut().cloudlet_submit(cloudlet, time) {
            Ok(estimate) => {
                log_debug!(
                    self.ctx,
                    "cloudlet {} submitted to vm {}, estimated finish time: {:?}",
                    cloudlet_id,
                    submitted.vm_id,
                    estimate
                );
            }
            Err(e) => {
                log_warn!(self.ctx, "cloudlet {} rejected: {}", cloudlet_id, e);
                self.fail_cloudlet(submitted);
            }
        }
        self.update_processing();
        self.schedule_optimization();
    }

    fn on_cloudlet_pause(&mut self, vm_id: u32, cloudlet_id: u32) {
        let time = self.ctx.time();
        self.update_processing();
        let result = match self.vms.get_mut(&vm_id) {
            Some(vm) => vm.scheduler_mut().cloudlet_pause(cloudlet_id, time),
            None => Err(CloudError::UnknownVm(vm_id)),
        };
        if let Err(e) = result {
            log_warn!(self.ctx, "cannot pause cloudlet {}: {}", cloudlet_id, e);
        }
        self.update_processing();
    }

    fn on_cloudlet_resume(&mut self, vm_id: u32, cloudlet_id: u32) {
        let time = self.ctx.time();
        self.update_processing();
        let result = match self.vms.get_mut(&vm_id) {
            Some(vm) => vm.scheduler_mut().cloudlet_resume(cloudlet_id, time),
            None => Err(CloudError::UnknownVm(vm_id)),
        };
        match result {
            Ok(estimate) => log_debug!(
                self.ctx,
                "cloudlet {} resumed, estimated finish time: {:?}",
                cloudlet_id,
                estimate
            ),
            Err(e) => log_warn!(self.ctx, "cannot resume cloudlet {}: {}", cloudlet_id, e),
        }
        self.update_processing();
        self.schedule_optimization();
    }

    fn on_cloudlet_cancel(&mut self, vm_id: u32, cloudlet_id: u32) {
        let time = self.ctx.time();
        self.update_processing();
        let result = match self.vms.get_mut(&vm_id) {
            Some(vm) => vm.scheduler_mut().cloudlet_cancel(cloudlet_id, time),
            None => Err(CloudError::UnknownVm(vm_id)),
        };
        match result {
            Ok(cloudlet) => self.return_cloudlet(cloudlet),
            Err(e) => log_warn!(self.ctx, "cannot cancel cloudlet {}: {}", cloudlet_id, e),
        }
        self.update_processing();
    }

    fn on_optimize_allocation(&mut self) {
        self.optimization_scheduled = false;
        self.update_processing();
        let migrations = self.allocation_policy.optimize_allocation(&self.hosts, &self.vms);
        if !migrations.is_empty() {
            log_trace!(self.ctx, "migration plan: {}", json!(migrations));
        }
        for migration in migrations {
            self.start_migration(migration);
        }
        self.schedule_optimization();
    }

    fn start_migration(&mut self, migration: Migration) {
        let Migration { vm_id, source, target } = migration;
        let vm = match self.vms.get_mut(&vm_id) {
            Some(vm) if vm.host() == Some(source) && vm.status() == VmStatus::Running => vm,
            _ => {
                log_warn!(self.ctx, "cannot migrate vm {} from host {}", vm_id, source);
                return;
            }
        };
        let target_host = match self.hosts.get_mut(target as usize) {
            Some(host) if target != source => host,
            _ => {
                log_warn!(self.ctx, "invalid migration target {} for vm {}", target, vm_id);
                return;
            }
        };
        if let Err(e) = target_host.reserve_for_migration(&vm.spec) {
            log_debug!(self.ctx, "migration of vm {} to host {} rejected: {}", vm_id, target, e);
            return;
        }
        vm.start_migration();
        self.allocation_policy.host_used(target, &self.hosts);

        let bandwidth = self.hosts[source as usize].spec.bw as f64 * self.sim_config.migration_bandwidth_share;
        let delay = if bandwidth > 0. {
            vm.spec.ram as f64 * 8. / bandwidth
        } else {
            0.
        };
        let event_id = self
            .ctx
            .emit_self(VmMigrationComplete { vm_id, source, target }, delay);
        self.migrations.insert(vm_id, event_id);
        log_info!(
            self.ctx,
            "started migration of vm {} from host {} to host {}, duration {:.3}",
            vm_id,
            source,
            target,
            delay
        );
    }

    fn on_vm_migration_complete(&mut self, vm_id: u32, source: u32, target: u32) {
        self.migrations.remove(&vm_id);
        self.update_processing();
        let vm = match self.vms.get_mut(&vm_id) {
            Some(vm) if vm.is_in_migration() => vm,
            _ => {
                log_warn!(self.ctx, "vm {} is not migrating", vm_id);
                return;
            }
        };
        self.hosts[source as usize].destroy_vm(vm_id);
        if let Err(e) = self.hosts[target as usize].complete_migration_in(vm_id) {
            log_error!(self.ctx, "migration of vm {} failed: {}", vm_id, e);
            panic!("{}", e);
        }
        vm.finish_migration(target);
        self.migration_count += 1;
        log_info!(
            self.ctx,
            "vm {} migrated from host {} to host {}",
            vm_id,
            source,
            target
        );
        self.update_processing();
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { spec } => {
                self.on_vm_create_request(spec, src);
            }
            VmDestroyRequest { vm_id } => {
                self.on_vm_destroy_request(vm_id);
            }
            CloudletSubmit { cloudlet } => {
                self.on_cloudlet_submit(cloudlet, src);
            }
            CloudletPause { vm_id, cloudlet_id } => {
                self.on_cloudlet_pause(vm_id, cloudlet_id);
            }
            CloudletResume { vm_id, cloudlet_id } => {
                self.on_cloudlet_resume(vm_id, cloudlet_id);
            }
            CloudletCancel { vm_id, cloudlet_id } => {
                self.on_cloudlet_cancel(vm_id, cloudlet_id);
            }
            UpdateProcessing {} => {
                self.next_update = None;
                self.update_processing();
            }
            OptimizeAllocation {} => {
                self.on_optimize_allocation();
            }
            VmMigrationComplete { vm_id, source, target } => {
                self.on_vm_migration_complete(vm_id, source, target);
            }
        })
    }

    fn on_shutdown(&mut self) {
        log_info!(
            self.ctx,
            "{} hosts, {} vms, {} migrations completed",
            self.hosts.len(),
            self.vms.len(),
            self.migration_count
        );
    }
}
