use serde::Serialize;

/// Cloudlet is considered finished when its remaining length (in MI) drops below this value.
pub const MIN_REMAINING_LENGTH: f64 = 1e-6;

/// Result of checking whether a host can accommodate a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AllocationVerdict {
    NotEnoughPes,
    NotEnoughMips,
    NotEnoughRam,
    NotEnoughBw,
    NotEnoughStorage,
    Success,
}
