//! Minimum Migration Time policy.

use crate::core::vm::Vm;
use crate::core::vm_selection_policy::{migratable, VmSelectionPolicy};

/// Selects the VM with the smallest RAM, which is the fastest to migrate.
#[derive(Default)]
pub struct MinimumMigrationTime;

impl MinimumMigrationTime {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for MinimumMigrationTime {
    fn select_vm(&mut self, candidates: &[&Vm]) -> Option<u32> {
        let mut result: Option<&Vm> = None;
        for vm in migratable(candidates) {
            if result.map_or(true, |best| vm.spec.ram < best.spec.ram) {
                result = Some(vm);
            }
        }
        result.map(|vm| vm.id)
    }
}
