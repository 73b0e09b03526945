//! Simple (worst fit) policy.

use std::collections::BTreeSet;

use crate::core::allocation_policy::VmAllocationPolicy;
use crate::core::host::Host;
use crate::core::vm::VmSpec;

/// Uses the suitable host with the most free PEs, spreading the load.
#[derive(Default)]
pub struct Simple;

impl Simple {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for Simple {
    fn find_host_for_vm(&self, vm: &VmSpec, hosts: &[Host], excluded: &BTreeSet<u32>) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_free_pes: u32 = 0;

        for host in hosts {
            if excluded.contains(&host.id) || !host.is_suitable_for_vm(vm) {
                continue;
            }
            if result.is_none() || host.free_pes() > max_free_pes {
                max_free_pes = host.free_pes();
                result = Some(host.id);
            }
        }
        result
    }
}
