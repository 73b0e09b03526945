//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::cloudlet_scheduler::CloudletSchedulerKind;
use crate::core::error::CloudError;
use crate::core::host::HostSpec;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub scheduling_interval: Option<f64>,
    pub min_time_between_events: Option<f64>,
    pub vm_allocation_retry_period: Option<f64>,
    pub vm_allocation_timeout: Option<f64>,
    pub migration_bandwidth_share: Option<f64>,
    pub seed: Option<u64>,
    pub hosts: Option<Vec<HostConfig>>,
    pub vms: Option<Vec<VmConfig>>,
    pub allocation_policy: Option<String>,
    pub vm_selection_policy: Option<String>,
    pub overload_detector: Option<String>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    pub pes: u32,
    /// MIPS of each PE.
    pub mips: f64,
    /// RAM in MB.
    pub ram: u64,
    /// Bandwidth in Mbit/s.
    pub bw: u64,
    /// Storage in MB.
    pub storage: u64,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl HostConfig {
    pub fn spec(&self) -> HostSpec {
        HostSpec {
            pes: self.pes,
            mips: self.mips,
            ram: self.ram,
            bw: self.bw,
            storage: self.storage,
        }
    }
}

/// Holds configuration of a VM type which can be requested by brokers.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmConfig {
    pub pes: u32,
    /// MIPS of each PE.
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
    #[serde(default)]
    pub scheduler: CloudletSchedulerKind,
    /// Number of such VMs.
    pub count: Option<u32>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Period in seconds between processing updates and allocation optimizations in datacenter.
    pub scheduling_interval: f64,
    /// Minimal delay in seconds between two processing updates.
    pub min_time_between_events: f64,
    /// Period in seconds for waiting before retrying failed VM allocation.
    pub vm_allocation_retry_period: f64,
    /// Timeout in seconds after which unallocated VM becomes failed.
    pub vm_allocation_timeout: f64,
    /// Fraction of host bandwidth used to transfer VM memory during migration.
    pub migration_bandwidth_share: f64,
    /// Seed of the random number generator.
    pub seed: u64,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
    /// VM types.
    pub vms: Vec<VmConfig>,
    /// VM allocation policy of the datacenter.
    pub allocation_policy: String,
    /// Policy for selecting VMs to migrate from overloaded hosts.
    pub vm_selection_policy: String,
    /// Overload detector, VM migrations are disabled if it is not set.
    pub overload_detector: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scheduling_interval: 300.,
            min_time_between_events: 0.01,
            vm_allocation_retry_period: 1.,
            vm_allocation_timeout: 50.,
            migration_bandwidth_share: 0.5,
            seed: 123,
            hosts: Vec::new(),
            vms: Vec::new(),
            allocation_policy: "Simple".to_string(),
            vm_selection_policy: "MinimumMigrationTime".to_string(),
            overload_detector: None,
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, CloudError> {
        let data = std::fs::read_to_string(file_name)
            .map_err(|e| CloudError::Config(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_str(&data)
    }

    /// Creates simulation config from YAML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(data: &str) -> Result<Self, CloudError> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(data).map_err(|e| CloudError::Config(format!("can't parse YAML: {}", e)))?;
        let default = Self::default();
        let config = Self {
            scheduling_interval: raw.scheduling_interval.unwrap_or(default.scheduling_interval),
            min_time_between_events: raw.min_time_between_events.unwrap_or(default.min_time_between_events),
            vm_allocation_retry_period: raw
                .vm_allocation_retry_period
                .unwrap_or(default.vm_allocation_retry_period),
            vm_allocation_timeout: raw.vm_allocation_timeout.unwrap_or(default.vm_allocation_timeout),
            migration_bandwidth_share: raw
                .migration_bandwidth_share
                .unwrap_or(default.migration_bandwidth_share),
            seed: raw.seed.unwrap_or(default.seed),
            hosts: raw.hosts.unwrap_or_default(),
            vms: raw.vms.unwrap_or_default(),
            allocation_policy: raw.allocation_policy.unwrap_or(default.allocation_policy),
            vm_selection_policy: raw.vm_selection_policy.unwrap_or(default.vm_selection_policy),
            overload_detector: raw.overload_detector,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CloudError> {
        if self.scheduling_interval <= 0. {
            return Err(CloudError::Config("scheduling_interval must be positive".to_string()));
        }
        if self.min_time_between_events <= 0. {
            return Err(CloudError::Config("min_time_between_events must be positive".to_string()));
        }
        if self.vm_allocation_retry_period <= 0. {
            return Err(CloudError::Config("vm_allocation_retry_period must be positive".to_string()));
        }
        if self.migration_bandwidth_share <= 0. || self.migration_bandwidth_share > 1. {
            return Err(CloudError::Config("migration_bandwidth_share must be in (0, 1]".to_string()));
        }
        Ok(())
    }

    /// Returns total hosts count.
    pub fn number_of_hosts(&self) -> u32 {
        self.hosts.iter().map(|h| h.count.unwrap_or(1)).sum()
    }
}
