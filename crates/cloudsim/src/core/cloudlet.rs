//! Representation of cloudlet and its status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Status of cloudlet.
///
/// `Created -> Ready -> InExec <-> Paused -> Success`, `Failed` and `Canceled` are terminal
/// and reachable from any non-terminal status after submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudletStatus {
    Created,
    Ready,
    InExec,
    Paused,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CloudletStatus::Success | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }

    /// Checks whether the status machine allows moving to `next`.
    pub fn can_change_to(&self, next: CloudletStatus) -> bool {
        use CloudletStatus::*;
        match (*self, next) {
            (Created, Ready) => true,
            (Ready, InExec) | (Ready, Paused) => true,
            (InExec, Paused) | (InExec, Success) => true,
            (Paused, InExec) | (Paused, Ready) => true,
            (Ready | InExec | Paused, Failed) => true,
            (Created | Ready | InExec | Paused, Canceled) => true,
            _ => false,
        }
    }
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Created => write!(f, "created"),
            CloudletStatus::Ready => write!(f, "ready"),
            CloudletStatus::InExec => write!(f, "in_exec"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Success => write!(f, "success"),
            CloudletStatus::Failed => write!(f, "failed"),
            CloudletStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Unit of work submitted by a broker to one of its VMs.
///
/// Length is measured in millions of instructions (MI).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cloudlet {
    pub id: u32,
    /// Id of the broker which owns the cloudlet, set on submission.
    pub broker: u32,
    pub vm_id: u32,
    pub length: f64,
    pub pes: u32,
    pub remaining: f64,
    status: CloudletStatus,
    pub submission_time: Option<f64>,
    pub exec_start_time: Option<f64>,
    pub finish_time: Option<f64>,
}

impl Cloudlet {
    pub fn new(id: u32, vm_id: u32, length: f64, pes: u32) -> Self {
        Self {
            id,
            broker: 0,
            vm_id,
            length,
            pes: pes.max(1),
            remaining: length,
            status: CloudletStatus::Created,
            submission_time: None,
            exec_start_time: None,
            finish_time: None,
        }
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    /// Moves the cloudlet to the next status.
    ///
    /// Panics on a transition that the status machine does not allow,
    /// since only cloudlet schedulers change statuses and they check the current status first.
    pub(crate) fn set_status(&mut self, status: CloudletStatus, time: f64) {
        if !self.status.can_change_to(status) {
            panic!(
                "Invalid transition of cloudlet {} from {} to {}",
                self.id, self.status, status
            );
        }
        if status == CloudletStatus::InExec && self.exec_start_time.is_none() {
            self.exec_start_time = Some(time);
        }
        if status.is_terminal() {
            self.finish_time = Some(time);
            if status == CloudletStatus::Success {
                self.remaining = 0.;
            }
        }
        self.status = status;
    }

    /// Fails a cloudlet which could not be accepted for execution, keeping the status of an already finished one.
    pub(crate) fn reject(&mut self, time: f64) {
        if self.status == CloudletStatus::Created {
            self.set_status(CloudletStatus::Ready, time);
        }
        if !self.status.is_terminal() {
            self.set_status(CloudletStatus::Failed, time);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Amount of work done so far, in MI.
    pub fn processed(&self) -> f64 {
        self.length - self.remaining
    }
}
