//! Host utilization history and its export.

use serde::{Deserialize, Serialize};

use crate::core::error::CloudError;
use crate::core::host::Host;

/// Host state recorded on each processing update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilizationHistoryEntry {
    pub time: f64,
    /// MIPS reserved by the hosted VMs.
    pub allocated_mips: f64,
    /// MIPS actually used by cloudlets running on the hosted VMs.
    pub requested_mips: f64,
    /// Whether the host had any VMs.
    pub active: bool,
}

#[derive(Serialize)]
struct UtilizationRecord {
    host_id: u32,
    time: f64,
    allocated_mips: f64,
    requested_mips: f64,
    utilization: f64,
    active: bool,
}

/// Writes utilization history of the hosts to a CSV file, one row per history entry.
pub fn export_utilization_csv(path: &str, hosts: &[Host]) -> Result<(), CloudError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| CloudError::Export(e.to_string()))?;
    for host in hosts {
        for entry in host.utilization_history() {
            writer
                .serialize(UtilizationRecord {
                    host_id: host.id,
                    time: entry.time,
                    allocated_mips: entry.allocated_mips,
                    requested_mips: entry.requested_mips,
                    utilization: entry.requested_mips / host.total_mips(),
                    active: entry.active,
                })
                .map_err(|e| CloudError::Export(e.to_string()))?;
        }
    }
    writer.flush().map_err(|e| CloudError::Export(e.to_string()))
}
