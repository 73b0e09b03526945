//! Random policy.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::vm::Vm;
use crate::core::vm_selection_policy::{migratable, VmSelectionPolicy};

/// Selects a random VM, the choice sequence is reproducible for a given seed.
pub struct RandomSelection {
    rand: Pcg64,
}

impl RandomSelection {
    pub fn new(seed: u64) -> Self {
        Self {
            rand: Pcg64::seed_from_u64(seed),
        }
    }
}

impl VmSelectionPolicy for RandomSelection {
    fn select_vm(&mut self, candidates: &[&Vm]) -> Option<u32> {
        let vms: Vec<&Vm> = migratable(candidates).collect();
        vms.choose(&mut self.rand).map(|vm| vm.id)
    }
}
