//! Minimum Utilization policy.

use crate::core::vm::Vm;
use crate::core::vm_selection_policy::{migratable, VmSelectionPolicy};

/// Selects the VM with the lowest CPU utilization.
#[derive(Default)]
pub struct MinimumUtilization;

impl MinimumUtilization {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmSelectionPolicy for MinimumUtilization {
    fn select_vm(&mut self, candidates: &[&Vm]) -> Option<u32> {
        let mut result: Option<&Vm> = None;
        for vm in migratable(candidates) {
            if result.map_or(true, |best| vm.utilization() < best.utilization()) {
                result = Some(vm);
            }
        }
        result.map(|vm| vm.id)
    }
}
