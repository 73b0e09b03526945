//! Broker component which acts on behalf of a cloud user.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use simcore::cast;
use simcore::context::SimulationContext;
use simcore::event::Event;
use simcore::handler::EventHandler;
use simcore::{log_debug, log_info, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::events::broker::{
    CloudletCancel, CloudletPause, CloudletResume, CloudletSubmit, VmCreateRequest, VmCreateRetry, VmDestroyRequest,
};
use crate::core::events::datacenter::{CloudletReturn, VmCreateAck, VmDestroyed};
use crate::core::vm::VmSpec;

/// Broker submits VMs and cloudlets to a datacenter and collects the results.
///
/// Cloudlets submitted before their VM is created are held by the broker and sent to the datacenter
/// once the VM creation is acknowledged. If the datacenter cannot place a VM, the creation request is
/// repeated every `vm_allocation_retry_period` until `vm_allocation_timeout` has passed since the first
/// request. After that the VM is considered failed and all its cloudlets fail as well.
pub struct Broker {
    pub id: u32,
    datacenter_id: u32,
    vm_specs: BTreeMap<u32, VmSpec>,
    vm_request_times: BTreeMap<u32, f64>,
    created_vms: BTreeMap<u32, u32>,
    failed_vms: BTreeSet<u32>,
    destroyed_vms: BTreeSet<u32>,
    held_cloudlets: BTreeMap<u32, Vec<Cloudlet>>,
    running_cloudlets: BTreeMap<u32, usize>,
    returned_cloudlets: Vec<Cloudlet>,
    destroy_idle_vms: bool,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Broker {
    pub fn new(datacenter_id: u32, ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            datacenter_id,
            vm_specs: BTreeMap::new(),
            vm_request_times: BTreeMap::new(),
            created_vms: BTreeMap::new(),
            failed_vms: BTreeSet::new(),
            destroyed_vms: BTreeSet::new(),
            held_cloudlets: BTreeMap::new(),
            running_cloudlets: BTreeMap::new(),
            returned_cloudlets: Vec::new(),
            destroy_idle_vms: true,
            ctx,
            sim_config,
        }
    }

    /// If enabled (the default), the broker destroys a VM as soon as all cloudlets submitted to it are returned.
    pub fn set_destroy_idle_vms(&mut self, enabled: bool) {
        self.destroy_idle_vms = enabled;
    }

    pub fn submit_vm(&mut self, spec: VmSpec) {
        let vm_id = spec.id;
        if self.vm_specs.contains_key(&vm_id) {
            log_warn!(self.ctx, "vm {} is already submitted", vm_id);
            return;
        }
        log_debug!(self.ctx, "requesting creation of vm {}", vm_id);
        self.vm_specs.insert(vm_id, spec.clone());
        self.vm_request_times.insert(vm_id, self.ctx.time());
        self.ctx.emit_now(VmCreateRequest { spec }, self.datacenter_id);
    }

    /// Submits cloudlet to its VM, holding it until the VM is created.
    pub fn submit_cloudlet(&mut self, cloudlet: Cloudlet) {
        let vm_id = cloudlet.vm_id;
        if self.failed_vms.contains(&vm_id) || self.destroyed_vms.contains(&vm_id) {
            log_warn!(self.ctx, "cloudlet {} is submitted to unavailable vm {}", cloudlet.id, vm_id);
            self.fail_cloudlet(cloudlet);
        } else if self.created_vms.contains_key(&vm_id) {
            self.send_cloudlet(cloudlet);
        } else {
            log_debug!(self.ctx, "cloudlet {} waits for creation of vm {}", cloudlet.id, vm_id);
            self.held_cloudlets.entry(vm_id).or_default().push(cloudlet);
        }
    }

    pub fn pause_cloudlet(&mut self, vm_id: u32, cloudlet_id: u32) {
        self.ctx
            .emit_now(CloudletPause { vm_id, cloudlet_id }, self.datacenter_id);
    }

    pub fn resume_cloudlet(&mut self, vm_id: u32, cloudlet_id: u32) {
        self.ctx
            .emit_now(CloudletResume { vm_id, cloudlet_id }, self.datacenter_id);
    }

    /// Cancels cloudlet, a cloudlet still held by the broker is canceled locally.
    pub fn cancel_cloudlet(&mut self, vm_id: u32, cloudlet_id: u32) {
        if let Some(held) = self.held_cloudlets.get_mut(&vm_id) {
            if let Some(pos) = held.iter().position(|c| c.id == cloudlet_id) {
                let mut cloudlet = held.remove(pos);
                cloudlet.set_status(CloudletStatus::Canceled, self.ctx.time());
                self.returned_cloudlets.push(cloudlet);
                return;
            }
        }
        self.ctx
            .emit_now(CloudletCancel { vm_id, cloudlet_id }, self.datacenter_id);
    }

    pub fn destroy_vm(&mut self, vm_id: u32) {
        log_debug!(self.ctx, "requesting destruction of vm {}", vm_id);
        self.running_cloudlets.remove(&vm_id);
        self.ctx.emit_now(VmDestroyRequest { vm_id }, self.datacenter_id);
    }

    /// Cloudlets returned by the datacenter or failed by the broker, in order of return.
    pub fn returned_cloudlets(&self) -> Vec<Cloudlet> {
        self.returned_cloudlets.clone()
    }

    pub fn returned_cloudlet(&self, cloudlet_id: u32) -> Option<Cloudlet> {
        self.returned_cloudlets.iter().find(|c| c.id == cloudlet_id).cloned()
    }

    pub fn created_vms(&self) -> Vec<u32> {
        self.created_vms.keys().copied().collect()
    }

    pub fn failed_vms(&self) -> Vec<u32> {
        self.failed_vms.iter().copied().collect()
    }

    pub fn destroyed_vms(&self) -> Vec<u32> {
        self.destroyed_vms.iter().copied().collect()
    }

    /// Host on which the VM was initially placed.
    pub fn vm_host(&self, vm_id: u32) -> Option<u32> {
        self.created_vms.get(&vm_id).copied()
    }

    fn send_cloudlet(&mut self, cloudlet: Cloudlet) {
        log_debug!(self.ctx, "submitting cloudlet {} to vm {}", cloudlet.id, cloudlet.vm_id);
        *self.running_cloudlets.entry(cloudlet.vm_id).or_default() += 1;
        self.ctx.emit_now(CloudletSubmit { cloudlet }, self.datacenter_id);
    }

    fn fail_cloudlet(&mut self, mut cloudlet: Cloudlet) {
        cloudlet.reject(self.ctx.time());
        self.returned_cloudlets.push(cloudlet);
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, host_id: Option<u32>) {
        match host_id {
            Some(host_id) => {
                log_debug!(self.ctx, "vm {} is created on host {}", vm_id, host_id);
                self.created_vms.insert(vm_id, host_id);
                for cloudlet in self.held_cloudlets.remove(&vm_id).unwrap_or_default() {
                    self.send_cloudlet(cloudlet);
                }
            }
            None => {
                log_debug!(
                    self.ctx,
                    "vm {} is not created, retrying in {}",
                    vm_id,
                    self.sim_config.vm_allocation_retry_period
                );
                self.ctx
                    .emit_self(VmCreateRetry { vm_id }, self.sim_config.vm_allocation_retry_period);
            }
        }
    }

    fn on_vm_create_retry(&mut self, vm_id: u32) {
        let (spec, request_time) = match (self.vm_specs.get(&vm_id), self.vm_request_times.get(&vm_id)) {
            (Some(spec), Some(time)) => (spec.clone(), *time),
            _ => return,
        };
        if self.ctx.time() > request_time + self.sim_config.vm_allocation_timeout {
            log_warn!(self.ctx, "vm {} failed to allocate", vm_id);
            self.failed_vms.insert(vm_id);
            for cloudlet in self.held_cloudlets.remove(&vm_id).unwrap_or_default() {
                self.fail_cloudlet(cloudlet);
            }
            return;
        }
        self.ctx.emit_now(VmCreateRequest { spec }, self.datacenter_id);
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "cloudlet {} returned with status {}",
            cloudlet.id,
            cloudlet.status()
        );
        let vm_id = cloudlet.vm_id;
        self.returned_cloudlets.push(cloudlet);
        if let Some(count) = self.running_cloudlets.get_mut(&vm_id) {
            *count = count.saturating_sub(1);
            if *count == 0 && self.destroy_idle_vms {
                self.destroy_vm(vm_id);
            }
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreateAck { vm_id, host_id } => {
                self.on_vm_create_ack(vm_id, host_id);
            }
            VmCreateRetry { vm_id } => {
                self.on_vm_create_retry(vm_id);
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
            VmDestroyed { vm_id } => {
                self.destroyed_vms.insert(vm_id);
            }
        })
    }

    fn on_shutdown(&mut self) {
        let succeeded = self
            .returned_cloudlets
            .iter()
            .filter(|c| c.status() == CloudletStatus::Success)
            .count();
        log_info!(
            self.ctx,
            "{} vms created, {} vms failed, {} of {} returned cloudlets succeeded",
            self.created_vms.len(),
            self.failed_vms.len(),
            succeeded,
            self.returned_cloudlets.len()
        );
    }
}
