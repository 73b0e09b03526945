//! Errors of the cloud model.

use thiserror::Error;

/// Recoverable failures of cloud model operations.
///
/// Operations check their preconditions before mutating anything,
/// so a returned error means that the state is left unchanged.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CloudError {
    /// No host can satisfy the VM demand in all resource dimensions.
    #[error("no suitable host found for vm {vm_id}")]
    PlacementFailure { vm_id: u32 },
    /// Utilization history is too short to compute a statistical measure.
    #[error("utilization history has {available} samples, at least {required} are required")]
    InsufficientHistory { available: usize, required: usize },
    /// Resource accounting became inconsistent, the run must not continue.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("unknown vm {0}")]
    UnknownVm(u32),
    #[error("unknown cloudlet {0}")]
    UnknownCloudlet(u32),
    /// Cloudlet cannot perform the requested status transition.
    #[error("cloudlet {id} cannot be {action} in its current status")]
    InvalidCloudletState { id: u32, action: &'static str },
    #[error("cloudlet {id} requires {required} pes, vm has only {available}")]
    InsufficientPes { id: u32, required: u32, available: u32 },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to export data: {0}")]
    Export(String),
}
