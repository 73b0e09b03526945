//! Migration-aware allocation.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::allocation_policy::{Migration, VmAllocationPolicy};
use crate::core::host::Host;
use crate::core::overload::OverloadDetector;
use crate::core::vm::{Vm, VmSpec};
use crate::core::vm_selection_policy::VmSelectionPolicy;

/// Extends a base policy with consolidation of overloaded hosts.
///
/// New VMs are placed by the base policy. On each optimization the policy finds overloaded hosts with the
/// overload detector and moves VMs chosen by the selection policy away from them, until each such host is no
/// longer overloaded or nothing else can be moved. Targets are found by the base policy among hosts which
/// are not overloaded and would not become overloaded after accepting the VM.
///
/// Planning is done on a copy of the hosts with side-effect free host searches, so neither the real hosts
/// nor the state of the base policy are touched. The datacenter reports the targets of started migrations
/// through [`host_used`](VmAllocationPolicy::host_used).
pub struct MigrationAwarePolicy {
    base: Box<dyn VmAllocationPolicy>,
    detector: Box<dyn OverloadDetector>,
    selection: Box<dyn VmSelectionPolicy>,
}

impl MigrationAwarePolicy {
    pub fn new(
        base: Box<dyn VmAllocationPolicy>,
        detector: Box<dyn OverloadDetector>,
        selection: Box<dyn VmSelectionPolicy>,
    ) -> Self {
        Self {
            base,
            detector,
            selection,
        }
    }

    pub fn is_host_overloaded(&self, host: &Host) -> bool {
        self.detector.is_overloaded(&host.utilization_values(), host.utilization())
    }

    fn find_target(
        &self,
        vm: &Vm,
        hosts: &[Host],
        histories: &[Vec<f64>],
        used_mips: &[f64],
        overloaded: &BTreeSet<u32>,
    ) -> Option<u32> {
        let mut excluded = overloaded.clone();
        loop {
            let target = self.base.find_host_for_vm(&vm.spec, hosts, &excluded)?;
            let t = target as usize;
            let utilization = (used_mips[t] + vm.used_mips()) / hosts[t].total_mips();
            if self.detector.is_overloaded(&histories[t], utilization) {
                excluded.insert(target);
            } else {
                return Some(target);
            }
        }
    }
}

impl VmAllocationPolicy for MigrationAwarePolicy {
    fn find_host_for_vm(&self, vm: &VmSpec, hosts: &[Host], excluded: &BTreeSet<u32>) -> Option<u32> {
        self.base.find_host_for_vm(vm, hosts, excluded)
    }

    fn host_used(&mut self, host_id: u32, hosts: &[Host]) {
        self.base.host_used(host_id, hosts);
    }

    fn optimize_allocation(&mut self, hosts: &[Host], vms: &BTreeMap<u32, Vm>) -> Vec<Migration> {
        let mut snapshot: Vec<Host> = hosts.to_vec();
        let histories: Vec<Vec<f64>> = hosts.iter().map(|h| h.utilization_values()).collect();
        // VMs still migrating in from earlier intervals will load their targets as well
        let mut used_mips: Vec<f64> = hosts
            .iter()
            .map(|h| {
                let incoming: f64 = h
                    .migrating_in_ids()
                    .iter()
                    .filter_map(|id| vms.get(id))
                    .map(|vm| vm.used_mips())
                    .sum();
                h.used_mips() + incoming
            })
            .collect();
        let overloaded: BTreeSet<u32> = hosts
            .iter()
            .filter(|h| self.is_host_overloaded(h))
            .map(|h| h.id)
            .collect();

        let mut migrations = Vec::new();
        let mut planned: BTreeSet<u32> = BTreeSet::new();
        for &source in overloaded.iter() {
            let s = source as usize;
            let mut rejected: BTreeSet<u32> = BTreeSet::new();
            while self
                .detector
                .is_overloaded(&histories[s], used_mips[s] / hosts[s].total_mips())
            {
                let candidates: Vec<&Vm> = snapshot[s]
                    .vm_ids()
                    .iter()
                    .filter(|id| !planned.contains(*id) && !rejected.contains(*id))
                    .filter_map(|id| vms.get(id))
                    .collect();
                let vm = match self.selection.select_vm(&candidates).and_then(|id| vms.get(&id)) {
                    Some(vm) => vm,
                    None => break,
                };
                let target = self.find_target(vm, &snapshot, &histories, &used_mips, &overloaded);
                match target {
                    Some(target) if snapshot[target as usize].reserve_for_migration(&vm.spec).is_ok() => {
                        used_mips[s] -= vm.used_mips();
                        used_mips[target as usize] += vm.used_mips();
                        planned.insert(vm.id);
                        migrations.push(Migration {
                            vm_id: vm.id,
                            source,
                            target,
                        });
                    }
                    _ => {
                        rejected.insert(vm.id);
                    }
                }
            }
        }
        migrations
    }
}
