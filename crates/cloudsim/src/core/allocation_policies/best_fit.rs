//! Best Fit policy.

use std::collections::BTreeSet;

use crate::core::allocation_policy::VmAllocationPolicy;
use crate::core::host::Host;
use crate::core::vm::VmSpec;

/// Uses the suitable host with the fewest free PEs.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for BestFit {
    fn find_host_for_vm(&self, vm: &VmSpec, hosts: &[Host], excluded: &BTreeSet<u32>) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_free_pes: u32 = u32::MAX;

        for host in hosts {
            if excluded.contains(&host.id) || !host.is_suitable_for_vm(vm) {
                continue;
            }
            if host.free_pes() < min_free_pes {
                min_free_pes = host.free_pes();
                result = Some(host.id);
            }
        }
        result
    }
}
