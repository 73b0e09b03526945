//! Time-shared cloudlet scheduler.

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{CloudletQueues, CloudletScheduler};
use crate::core::error::CloudError;

/// Runs all submitted cloudlets at once, sharing the VM capacity fairly among them.
///
/// Per-PE capacity equals `total_mips / max(pes_in_use, vm_pes)`, a cloudlet gets this capacity multiplied
/// by the number of PEs it requests.
#[derive(Clone, Default)]
pub struct TimeSharedScheduler {
    queues: CloudletQueues,
}

impl TimeSharedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn capacity(&self) -> f64 {
        let pes = self.queues.pes_in_use().max(self.queues.vm_pes());
        if pes == 0 {
            return 0.;
        }
        self.queues.total_mips() / pes as f64
    }

    fn start(&mut self, mut cloudlet: Cloudlet, time: f64) -> Option<f64> {
        cloudlet.set_status(CloudletStatus::InExec, time);
        self.queues.exec.push(cloudlet);
        let capacity = self.capacity();
        self.queues
            .exec
            .last()
            .and_then(|c| self.queues.estimated_finish_time(c, time, capacity))
    }
}

impl CloudletScheduler for TimeSharedScheduler {
    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.queues.mips_share = mips_share.to_vec();
        let capacity = self.capacity();
        self.queues.advance(time, capacity);
        self.queues.next_completion(time, self.capacity())
    }

    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Result<Option<f64>, CloudError> {
        let cloudlet = self.queues.accept(cloudlet, time)?;
        Ok(self.start(cloudlet, time))
    }

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> Result<(), CloudError> {
        self.queues.pause(cloudlet_id, time)
    }

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> Result<Option<f64>, CloudError> {
        let cloudlet = self.queues.take_paused(cloudlet_id)?;
        Ok(self.start(cloudlet, time))
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Result<Cloudlet, CloudError> {
        self.queues.cancel(cloudlet_id, time)
    }

    fn cloudlet_fail_all(&mut self, time: f64) -> Vec<Cloudlet> {
        self.queues.fail_all(time)
    }

    fn allocated_mips_for_cloudlet(&self, cloudlet_id: u32) -> f64 {
        match self.queues.exec.iter().find(|c| c.id == cloudlet_id) {
            Some(cloudlet) => self.capacity() * cloudlet.pes as f64,
            None => 0.,
        }
    }

    fn used_mips(&self) -> f64 {
        self.capacity() * self.queues.pes_in_use() as f64
    }

    fn take_finished(&mut self) -> Vec<Cloudlet> {
        std::mem::take(&mut self.queues.finished)
    }

    fn cloudlet(&self, cloudlet_id: u32) -> Option<Cloudlet> {
        self.queues.find(cloudlet_id).cloned()
    }

    fn cloudlets(&self) -> Vec<Cloudlet> {
        self.queues.snapshot()
    }

    fn has_unfinished(&self) -> bool {
        self.queues.has_unfinished()
    }

    fn is_busy(&self) -> bool {
        self.queues.is_busy()
    }
}
