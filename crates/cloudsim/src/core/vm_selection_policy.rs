//! Selection of VMs to migrate from overloaded hosts.

use crate::core::config::{parse_config_value, parse_option, parse_options};
use crate::core::error::CloudError;
use crate::core::vm::Vm;
use crate::core::vm_selection_policies::minimum_migration_time::MinimumMigrationTime;
use crate::core::vm_selection_policies::minimum_utilization::MinimumUtilization;
use crate::core::vm_selection_policies::random::RandomSelection;

/// Trait for implementation of VM selection policies.
///
/// Candidates are VMs of an overloaded host in the order of their ids. VMs which are already migrating
/// are never selected. Returns `None` if there is nothing to select.
pub trait VmSelectionPolicy {
    fn select_vm(&mut self, candidates: &[&Vm]) -> Option<u32>;
}

pub(crate) fn migratable<'a>(candidates: &'a [&'a Vm]) -> impl Iterator<Item = &'a Vm> + 'a {
    candidates.iter().copied().filter(|vm| !vm.is_in_migration())
}

pub fn vm_selection_policy_resolver(config_str: &str, seed: u64) -> Result<Box<dyn VmSelectionPolicy>, CloudError> {
    let (policy_name, options) = parse_config_value(config_str);
    let options = parse_options(&options.unwrap_or_default());
    match policy_name.as_str() {
        "MinimumMigrationTime" => Ok(Box::new(MinimumMigrationTime::new())),
        "MinimumUtilization" => Ok(Box::new(MinimumUtilization::new())),
        "Random" => Ok(Box::new(RandomSelection::new(parse_option(&options, "seed", seed)?))),
        _ => Err(CloudError::Config(format!("unknown vm selection policy: {}", config_str))),
    }
}
