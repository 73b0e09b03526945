//! Bookkeeping of a single host resource shared among VMs.

use std::collections::BTreeMap;

use serde::Serialize;

/// Tracks how much of one resource kind (PEs, RAM, bandwidth or storage) is allocated to each VM of a host.
#[derive(Clone, Debug, Serialize)]
pub struct ResourceProvisioner {
    capacity: u64,
    allocated: u64,
    allocations: BTreeMap<u32, u64>,
}

impl ResourceProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            allocated: 0,
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.allocated
    }

    /// Returns the amount allocated to the VM, zero if it has no allocation.
    pub fn allocated_for_vm(&self, vm_id: u32) -> u64 {
        self.allocations.get(&vm_id).copied().unwrap_or(0)
    }

    /// Checks that `amount` fits into the headroom left by other VMs, does not change anything.
    pub fn is_suitable_for_vm(&self, vm_id: u32, amount: u64) -> bool {
        amount <= self.available() + self.allocated_for_vm(vm_id)
    }

    /// Replaces the current allocation of the VM with `amount`.
    ///
    /// Returns `false` and leaves the allocation untouched if the amount does not fit.
    pub fn allocate_resource_for_vm(&mut self, vm_id: u32, amount: u64) -> bool {
        if !self.is_suitable_for_vm(vm_id, amount) {
            return false;
        }
        self.deallocate_resource_for_vm(vm_id);
        self.allocated += amount;
        self.allocations.insert(vm_id, amount);
        true
    }

    /// Releases the allocation of the VM and returns the freed amount.
    pub fn deallocate_resource_for_vm(&mut self, vm_id: u32) -> u64 {
        let freed = self.allocations.remove(&vm_id).unwrap_or(0);
        self.allocated -= freed;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_replaces_previous_amount() {
        let mut ram = ResourceProvisioner::new(1024);
        assert!(ram.allocate_resource_for_vm(1, 512));
        assert!(ram.allocate_resource_for_vm(1, 768));
        assert_eq!(ram.allocated_for_vm(1), 768);
        assert_eq!(ram.available(), 256);

        assert!(ram.allocate_resource_for_vm(1, 128));
        assert_eq!(ram.allocated(), 128);
    }

    #[test]
    fn test_allocation_respects_headroom() {
        let mut ram = ResourceProvisioner::new(1024);
        assert!(ram.allocate_resource_for_vm(1, 600));
        assert!(!ram.is_suitable_for_vm(2, 500));
        assert!(!ram.allocate_resource_for_vm(2, 500));
        assert_eq!(ram.allocated_for_vm(2), 0);
        assert_eq!(ram.allocated(), 600);

        // own allocation counts as headroom
        assert!(ram.is_suitable_for_vm(1, 1024));
        assert!(!ram.is_suitable_for_vm(1, 1025));
    }

    #[test]
    fn test_deallocation() {
        let mut bw = ResourceProvisioner::new(100);
        bw.allocate_resource_for_vm(7, 40);
        assert_eq!(bw.deallocate_resource_for_vm(7), 40);
        assert_eq!(bw.deallocate_resource_for_vm(7), 0);
        assert_eq!(bw.available(), 100);
    }
}
