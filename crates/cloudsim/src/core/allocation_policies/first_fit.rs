//! First Fit policy.

use std::collections::BTreeSet;

use crate::core::allocation_policy::VmAllocationPolicy;
use crate::core::host::Host;
use crate::core::vm::VmSpec;

/// Uses the first suitable host, scanning from the successor of the host used last time and wrapping around.
#[derive(Default)]
pub struct FirstFit {
    next_index: usize,
}

impl FirstFit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position from which the next search starts.
    pub fn next_index(&self) -> usize {
        self.next_index
    }
}

impl VmAllocationPolicy for FirstFit {
    fn find_host_for_vm(&self, vm: &VmSpec, hosts: &[Host], excluded: &BTreeSet<u32>) -> Option<u32> {
        let n = hosts.len();
        (0..n)
            .map(|offset| &hosts[(self.next_index + offset) % n])
            .find(|host| !excluded.contains(&host.id) && host.is_suitable_for_vm(vm))
            .map(|host| host.id)
    }

    fn host_used(&mut self, host_id: u32, hosts: &[Host]) {
        if !hosts.is_empty() {
            self.next_index = (host_id as usize + 1) % hosts.len();
        }
    }
}
