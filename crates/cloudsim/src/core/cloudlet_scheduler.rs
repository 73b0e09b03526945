//! Sharing of VM processing capacity among cloudlets.

use dyn_clone::{clone_trait_object, DynClone};
use serde::{Deserialize, Serialize};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_schedulers::space_shared::SpaceSharedScheduler;
use crate::core::cloudlet_schedulers::time_shared::TimeSharedScheduler;
use crate::core::common::MIN_REMAINING_LENGTH;
use crate::core::error::CloudError;

/// Trait for implementation of cloudlet schedulers.
///
/// Each VM owns a scheduler, which distributes the VM MIPS share among the VM cloudlets and advances their
/// remaining length as simulated time passes. The scheduler never touches the event queue: the owner calls
/// [`update_processing`](Self::update_processing) and uses the returned time to schedule the next update.
///
/// Operations which change the set of executing cloudlets assume that processing was already updated to the
/// passed time.
pub trait CloudletScheduler: DynClone {
    /// Advances executing cloudlets up to `time` using `mips_share` (MIPS of each VM PE),
    /// returns the time of the next expected cloudlet completion or `None` if nothing is executing.
    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64>;

    /// Accepts a new cloudlet, returns its estimated finish time if it started executing right away.
    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Result<Option<f64>, CloudError>;

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> Result<(), CloudError>;

    /// Resumes a paused cloudlet, returns its estimated finish time computed from the current capacity
    /// if it started executing right away.
    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> Result<Option<f64>, CloudError>;

    /// Cancels an unfinished cloudlet and hands it back.
    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Result<Cloudlet, CloudError>;

    /// Fails all unfinished cloudlets, used when the VM is destroyed.
    fn cloudlet_fail_all(&mut self, time: f64) -> Vec<Cloudlet>;

    /// MIPS currently allocated to the cloudlet, zero if it is not executing.
    fn allocated_mips_for_cloudlet(&self, cloudlet_id: u32) -> f64;

    /// Total MIPS currently allocated to executing cloudlets.
    fn used_mips(&self) -> f64;

    /// Removes and returns cloudlets which completed successfully since the last call.
    fn take_finished(&mut self) -> Vec<Cloudlet>;

    fn cloudlet(&self, cloudlet_id: u32) -> Option<Cloudlet>;

    /// Returns copies of all cloudlets known to the scheduler, including finished ones not taken yet.
    fn cloudlets(&self) -> Vec<Cloudlet>;

    fn has_unfinished(&self) -> bool;

    /// Whether some cloudlet is executing or waiting for PEs, paused cloudlets are not counted.
    fn is_busy(&self) -> bool;
}

clone_trait_object!(CloudletScheduler);

/// Kind of cloudlet scheduler requested for a VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudletSchedulerKind {
    TimeShared,
    SpaceShared,
}

impl Default for CloudletSchedulerKind {
    fn default() -> Self {
        CloudletSchedulerKind::TimeShared
    }
}

impl CloudletSchedulerKind {
    pub fn build(&self) -> Box<dyn CloudletScheduler> {
        match self {
            CloudletSchedulerKind::TimeShared => Box::new(TimeSharedScheduler::new()),
            CloudletSchedulerKind::SpaceShared => Box::new(SpaceSharedScheduler::new()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Cloudlet lists and the last known MIPS share, common to all schedulers.
#[derive(Clone, Default)]
pub(crate) struct CloudletQueues {
    pub exec: Vec<Cloudlet>,
    pub waiting: Vec<Cloudlet>,
    pub paused: Vec<Cloudlet>,
    pub finished: Vec<Cloudlet>,
    pub previous_time: f64,
    pub mips_share: Vec<f64>,
}

impl CloudletQueues {
    pub fn total_mips(&self) -> f64 {
        self.mips_share.iter().sum()
    }

    pub fn vm_pes(&self) -> u32 {
        self.mips_share.len() as u32
    }

    pub fn pes_in_use(&self) -> u32 {
        self.exec.iter().map(|c| c.pes).sum()
    }

    /// Advances executing cloudlets by `elapsed * per_pe_mips * pes` and moves completed ones to the finished list.
    pub fn advance(&mut self, time: f64, per_pe_mips: f64) {
        let elapsed = time - self.previous_time;
        if elapsed > 0. {
            for cloudlet in self.exec.iter_mut() {
                cloudlet.remaining = (cloudlet.remaining - elapsed * per_pe_mips * cloudlet.pes as f64).max(0.);
            }
        }
        self.previous_time = time;

        let mut i = 0;
        while i < self.exec.len() {
            if self.exec[i].remaining <= MIN_REMAINING_LENGTH {
                let mut cloudlet = self.exec.remove(i);
                cloudlet.set_status(CloudletStatus::Success, time);
                self.finished.push(cloudlet);
            } else {
                i += 1;
            }
        }
    }

    pub fn estimated_finish_time(&self, cloudlet: &Cloudlet, time: f64, per_pe_mips: f64) -> Option<f64> {
        let rate = per_pe_mips * cloudlet.pes as f64;
        if rate <= 0. {
            return None;
        }
        Some(time + cloudlet.remaining / rate)
    }

    pub fn next_completion(&self, time: f64, per_pe_mips: f64) -> Option<f64> {
        self.exec
            .iter()
            .filter_map(|c| self.estimated_finish_time(c, time, per_pe_mips))
            .reduce(f64::min)
    }

    /// Checks the new cloudlet and moves it to `Ready`.
    pub fn accept(&self, mut cloudlet: Cloudlet, time: f64) -> Result<Cloudlet, CloudError> {
        if cloudlet.status() != CloudletStatus::Created || self.find(cloudlet.id).is_some() {
            return Err(CloudError::InvalidCloudletState {
                id: cloudlet.id,
                action: "submitted",
            });
        }
        cloudlet.submission_time = Some(time);
        cloudlet.set_status(CloudletStatus::Ready, time);
        Ok(cloudlet)
    }

    pub fn find(&self, cloudlet_id: u32) -> Option<&Cloudlet> {
        self.exec
            .iter()
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .find(|c| c.id == cloudlet_id)
    }

    /// Moves an executing or waiting cloudlet to the paused list.
    pub fn pause(&mut self, cloudlet_id: u32, time: f64) -> Result<(), CloudError> {
        let mut cloudlet = match take(&mut self.exec, cloudlet_id).or_else(|| take(&mut self.waiting, cloudlet_id)) {
            Some(cloudlet) => cloudlet,
            None => return Err(self.missing(cloudlet_id, "paused")),
        };
        cloudlet.set_status(CloudletStatus::Paused, time);
        self.paused.push(cloudlet);
        Ok(())
    }

    pub fn take_paused(&mut self, cloudlet_id: u32) -> Result<Cloudlet, CloudError> {
        take(&mut self.paused, cloudlet_id).ok_or_else(|| self.missing(cloudlet_id, "resumed"))
    }

    pub fn cancel(&mut self, cloudlet_id: u32, time: f64) -> Result<Cloudlet, CloudError> {
        let mut cloudlet = match take(&mut self.exec, cloudlet_id)
            .or_else(|| take(&mut self.waiting, cloudlet_id))
            .or_else(|| take(&mut self.paused, cloudlet_id))
        {
            Some(cloudlet) => cloudlet,
            None => return Err(self.missing(cloudlet_id, "canceled")),
        };
        cloudlet.set_status(CloudletStatus::Canceled, time);
        Ok(cloudlet)
    }

    pub fn fail_all(&mut self, time: f64) -> Vec<Cloudlet> {
        let mut failed = Vec::new();
        for mut cloudlet in self
            .exec
            .drain(..)
            .chain(self.waiting.drain(..))
            .chain(self.paused.drain(..))
        {
            cloudlet.set_status(CloudletStatus::Failed, time);
            failed.push(cloudlet);
        }
        failed.sort_by_key(|c| c.id);
        failed
    }

    pub fn snapshot(&self) -> Vec<Cloudlet> {
        let mut cloudlets: Vec<Cloudlet> = self
            .exec
            .iter()
            .chain(self.waiting.iter())
            .chain(self.paused.iter())
            .chain(self.finished.iter())
            .cloned()
            .collect();
        cloudlets.sort_by_key(|c| c.id);
        cloudlets
    }

    pub fn has_unfinished(&self) -> bool {
        self.is_busy() || !self.paused.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        !self.exec.is_empty() || !self.waiting.is_empty()
    }

    fn missing(&self, cloudlet_id: u32, action: &'static str) -> CloudError {
        if self.find(cloudlet_id).is_some() {
            CloudError::InvalidCloudletState { id: cloudlet_id, action }
        } else {
            CloudError::UnknownCloudlet(cloudlet_id)
        }
    }
}

fn take(list: &mut Vec<Cloudlet>, cloudlet_id: u32) -> Option<Cloudlet> {
    let pos = list.iter().position(|c| c.id == cloudlet_id)?;
    Some(list.remove(pos))
}
