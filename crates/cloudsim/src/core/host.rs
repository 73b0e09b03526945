//! Physical host and its resources.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::common::AllocationVerdict;
use crate::core::error::CloudError;
use crate::core::provisioner::ResourceProvisioner;
use crate::core::utilization::UtilizationHistoryEntry;
use crate::core::vm::{Vm, VmSpec};

/// Capacity of a physical host.
///
/// MIPS is the capacity of each PE, RAM and storage are in MB, bandwidth is in Mbit/s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HostSpec {
    pub pes: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

/// Represents physical host.
///
/// Each resource kind is tracked by its own [`ResourceProvisioner`]. A VM migrating to the host has its
/// resources reserved here while it still runs on the source host.
#[derive(Clone)]
pub struct Host {
    pub id: u32,
    pub spec: HostSpec,
    vms: BTreeSet<u32>,
    migrating_in: BTreeSet<u32>,
    pes: ResourceProvisioner,
    ram: ResourceProvisioner,
    bw: ResourceProvisioner,
    storage: ResourceProvisioner,
    vm_mips: BTreeMap<u32, f64>,
    utilization_history: Vec<UtilizationHistoryEntry>,
}

impl Host {
    pub fn new(id: u32, spec: HostSpec) -> Self {
        Self {
            id,
            pes: ResourceProvisioner::new(spec.pes as u64),
            ram: ResourceProvisioner::new(spec.ram),
            bw: ResourceProvisioner::new(spec.bw),
            storage: ResourceProvisioner::new(spec.storage),
            spec,
            vms: BTreeSet::new(),
            migrating_in: BTreeSet::new(),
            vm_mips: BTreeMap::new(),
            utilization_history: Vec::new(),
        }
    }

    pub fn total_mips(&self) -> f64 {
        self.spec.pes as f64 * self.spec.mips
    }

    pub fn free_pes(&self) -> u32 {
        self.pes.available() as u32
    }

    pub fn available_ram(&self) -> u64 {
        self.ram.available()
    }

    pub fn available_bw(&self) -> u64 {
        self.bw.available()
    }

    pub fn available_storage(&self) -> u64 {
        self.storage.available()
    }

    pub fn allocated_pes(&self) -> u32 {
        self.pes.allocated() as u32
    }

    pub fn allocated_ram(&self) -> u64 {
        self.ram.allocated()
    }

    pub fn allocated_bw(&self) -> u64 {
        self.bw.allocated()
    }

    pub fn allocated_storage(&self) -> u64 {
        self.storage.allocated()
    }

    /// MIPS reserved by hosted and migrating-in VMs.
    pub fn allocated_mips(&self) -> f64 {
        self.vm_mips.values().sum()
    }

    /// Ids of VMs running on the host, not including VMs migrating to it.
    pub fn vm_ids(&self) -> Vec<u32> {
        self.vms.iter().copied().collect()
    }

    pub fn migrating_in_ids(&self) -> Vec<u32> {
        self.migrating_in.iter().copied().collect()
    }

    pub fn has_vm(&self, vm_id: u32) -> bool {
        self.vms.contains(&vm_id) || self.migrating_in.contains(&vm_id)
    }

    /// Host is active if it runs or receives at least one VM.
    pub fn is_active(&self) -> bool {
        !self.vms.is_empty() || !self.migrating_in.is_empty()
    }

    pub fn can_allocate(&self, vm: &VmSpec) -> AllocationVerdict {
        if vm.mips > self.spec.mips {
            return AllocationVerdict::NotEnoughMips;
        }
        if !self.pes.is_suitable_for_vm(vm.id, vm.pes as u64) {
            return AllocationVerdict::NotEnoughPes;
        }
        if !self.ram.is_suitable_for_vm(vm.id, vm.ram) {
            return AllocationVerdict::NotEnoughRam;
        }
        if !self.bw.is_suitable_for_vm(vm.id, vm.bw) {
            return AllocationVerdict::NotEnoughBw;
        }
        if !self.storage.is_suitable_for_vm(vm.id, vm.storage) {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    /// Checks that PEs, MIPS, RAM, bandwidth and storage all fit.
    pub fn is_suitable_for_vm(&self, vm: &VmSpec) -> bool {
        !self.has_vm(vm.id) && self.can_allocate(vm) == AllocationVerdict::Success
    }

    fn reserve(&mut self, vm: &VmSpec) -> Result<(), CloudError> {
        if !self.is_suitable_for_vm(vm) {
            return Err(CloudError::PlacementFailure { vm_id: vm.id });
        }
        let committed = self.pes.allocate_resource_for_vm(vm.id, vm.pes as u64)
            && self.ram.allocate_resource_for_vm(vm.id, vm.ram)
            && self.bw.allocate_resource_for_vm(vm.id, vm.bw)
            && self.storage.allocate_resource_for_vm(vm.id, vm.storage);
        if !committed {
            self.release(vm.id);
            return Err(CloudError::InvariantViolation(format!(
                "host {} accepted vm {} but failed to provision it",
                self.id, vm.id
            )));
        }
        self.vm_mips.insert(vm.id, vm.total_mips());
        Ok(())
    }

    fn release(&mut self, vm_id: u32) {
        self.vm_mips.remove(&vm_id);
        self.pes.deallocate_resource_for_vm(vm_id);
        self.ram.deallocate_resource_for_vm(vm_id);
        self.bw.deallocate_resource_for_vm(vm_id);
        self.storage.deallocate_resource_for_vm(vm_id);
    }

    /// Allocates resources for the VM and starts hosting it.
    ///
    /// Nothing is changed if the VM does not fit.
    pub fn create_vm(&mut self, vm: &VmSpec) -> Result<(), CloudError> {
        self.reserve(vm)?;
        self.vms.insert(vm.id);
        Ok(())
    }

    /// Reserves resources for a VM which is being migrated to this host.
    pub fn reserve_for_migration(&mut self, vm: &VmSpec) -> Result<(), CloudError> {
        self.reserve(vm)?;
        self.migrating_in.insert(vm.id);
        Ok(())
    }

    /// Turns the reservation of a migrated VM into a regular hosted VM.
    pub fn complete_migration_in(&mut self, vm_id: u32) -> Result<(), CloudError> {
        if !self.migrating_in.remove(&vm_id) {
            return Err(CloudError::InvariantViolation(format!(
                "vm {} is not migrating to host {}",
                vm_id, self.id
            )));
        }
        self.vms.insert(vm_id);
        Ok(())
    }

    /// Releases all resources of the VM, returns `false` if the VM was not on this host.
    pub fn destroy_vm(&mut self, vm_id: u32) -> bool {
        let removed = self.vms.remove(&vm_id) | self.migrating_in.remove(&vm_id);
        if removed {
            self.release(vm_id);
        }
        removed
    }

    /// Advances processing of the hosted VMs up to `time` and records utilization.
    ///
    /// Returns the earliest expected cloudlet completion among the VMs.
    pub fn update_processing(&mut self, time: f64, vms: &mut BTreeMap<u32, Vm>) -> Option<f64> {
        let mut next_event: Option<f64> = None;
        let mut requested_mips = 0.;
        for vm_id in self.vms.iter() {
            if let Some(vm) = vms.get_mut(vm_id) {
                if let Some(t) = vm.update_processing(time) {
                    next_event = Some(next_event.map_or(t, |n| n.min(t)));
                }
                requested_mips += vm.used_mips();
            }
        }
        let entry = UtilizationHistoryEntry {
            time,
            allocated_mips: self.allocated_mips(),
            requested_mips,
            active: self.is_active(),
        };
        match self.utilization_history.last_mut() {
            Some(last) if last.time == time => *last = entry,
            _ => self.utilization_history.push(entry),
        }
        next_event
    }

    pub fn utilization_history(&self) -> &[UtilizationHistoryEntry] {
        &self.utilization_history
    }

    /// Past utilization values as fractions of host capacity, oldest first.
    pub fn utilization_values(&self) -> Vec<f64> {
        let total = self.total_mips();
        self.utilization_history
            .iter()
            .map(|e| if total > 0. { e.requested_mips / total } else { 0. })
            .collect()
    }

    /// Latest recorded utilization as a fraction of host capacity.
    pub fn utilization(&self) -> f64 {
        if self.total_mips() <= 0. {
            return 0.;
        }
        self.used_mips() / self.total_mips()
    }

    /// MIPS used by cloudlets at the latest update.
    pub fn used_mips(&self) -> f64 {
        self.utilization_history.last().map_or(0., |e| e.requested_mips)
    }
}
