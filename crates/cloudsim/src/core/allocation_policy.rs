//! Virtual machine allocation policies.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::allocation_policies::best_fit::BestFit;
use crate::core::allocation_policies::first_fit::FirstFit;
use crate::core::allocation_policies::migration::MigrationAwarePolicy;
use crate::core::allocation_policies::simple::Simple;
use crate::core::config::{parse_config_value, SimulationConfig};
use crate::core::error::CloudError;
use crate::core::host::Host;
use crate::core::overload::overload_detector_resolver;
use crate::core::vm::{Vm, VmSpec};
use crate::core::vm_selection_policy::vm_selection_policy_resolver;

/// Planned move of a VM between hosts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub vm_id: u32,
    pub source: u32,
    pub target: u32,
}

/// Trait for implementation of VM allocation policies.
///
/// The policy is owned by a datacenter. Its core is the host search algorithm, the datacenter calls
/// [`allocate_host_for_vm`](Self::allocate_host_for_vm) and [`deallocate_host_for_vm`](Self::deallocate_host_for_vm)
/// on VM creation and destruction, and [`optimize_allocation`](Self::optimize_allocation) on every scheduling
/// interval.
///
/// Hosts are identified by their position in the datacenter host list. Ties between equally good hosts are
/// resolved by this order.
pub trait VmAllocationPolicy {
    /// Returns a host able to run the VM, skipping hosts from `excluded`, or `None` if there is no such host.
    ///
    /// The search has no side effects, so it can be used to plan placements which are never carried out.
    fn find_host_for_vm(&self, vm: &VmSpec, hosts: &[Host], excluded: &BTreeSet<u32>) -> Option<u32>;

    /// Called after a VM was actually placed on the host, either on creation or as a migration target.
    fn host_used(&mut self, _host_id: u32, _hosts: &[Host]) {}

    /// Places the VM on the host selected by the policy.
    fn allocate_host_for_vm(&mut self, vm: &mut Vm, hosts: &mut [Host], time: f64) -> Result<u32, CloudError> {
        if let Some(host_id) = vm.host() {
            return Err(CloudError::InvariantViolation(format!(
                "vm {} is already allocated to host {}",
                vm.id, host_id
            )));
        }
        let host_id = self
            .find_host_for_vm(&vm.spec, hosts, &BTreeSet::new())
            .ok_or(CloudError::PlacementFailure { vm_id: vm.id })?;
        let host = hosts
            .get_mut(host_id as usize)
            .ok_or_else(|| CloudError::InvariantViolation(format!("policy selected unknown host {}", host_id)))?;
        host.create_vm(&vm.spec)?;
        vm.place(host_id, time);
        self.host_used(host_id, hosts);
        Ok(host_id)
    }

    /// Releases all resources held by the VM, including a pending migration reservation.
    ///
    /// Does nothing if the VM is not allocated.
    fn deallocate_host_for_vm(&mut self, vm: &mut Vm, hosts: &mut [Host]) {
        vm.unplace();
        for host in hosts.iter_mut() {
            host.destroy_vm(vm.id);
        }
    }

    /// Returns VMs which should be moved to other hosts.
    fn optimize_allocation(&mut self, _hosts: &[Host], _vms: &BTreeMap<u32, Vm>) -> Vec<Migration> {
        Vec::new()
    }
}

pub fn allocation_policy_resolver(config_str: &str) -> Result<Box<dyn VmAllocationPolicy>, CloudError> {
    let (policy_name, _options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "Simple" | "WorstFit" => Ok(Box::new(Simple::new())),
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        _ => Err(CloudError::Config(format!("unknown allocation policy: {}", config_str))),
    }
}

/// Builds the allocation policy described by the config.
///
/// If an overload detector is configured, the base policy is wrapped into a migration-aware policy.
pub fn allocation_policy_from_config(config: &SimulationConfig) -> Result<Box<dyn VmAllocationPolicy>, CloudError> {
    let base = allocation_policy_resolver(&config.allocation_policy)?;
    match &config.overload_detector {
        Some(detector) => Ok(Box::new(MigrationAwarePolicy::new(
            base,
            overload_detector_resolver(detector)?,
            vm_selection_policy_resolver(&config.vm_selection_policy, config.seed)?,
        ))),
        None => Ok(base),
    }
}
