//! Space-shared cloudlet scheduler.

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{CloudletQueues, CloudletScheduler};
use crate::core::error::CloudError;

/// Gives each executing cloudlet exclusive PEs running at full per-PE MIPS.
///
/// Cloudlets which do not fit into free PEs wait in the `Ready` status and are admitted in submission order
/// when PEs become free. A cloudlet requiring more PEs than the VM has is rejected on submission.
#[derive(Clone, Default)]
pub struct SpaceSharedScheduler {
    queues: CloudletQueues,
}

impl SpaceSharedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn per_pe_mips(&self) -> f64 {
        let pes = self.queues.vm_pes();
        if pes == 0 {
            return 0.;
        }
        self.queues.total_mips() / pes as f64
    }

    fn free_pes(&self) -> u32 {
        self.queues.vm_pes().saturating_sub(self.queues.pes_in_use())
    }

    fn admit_waiting(&mut self, time: f64) {
        let mut i = 0;
        while i < self.queues.waiting.len() {
            if self.queues.waiting[i].pes <= self.free_pes() {
                let mut cloudlet = self.queues.waiting.remove(i);
                cloudlet.set_status(CloudletStatus::InExec, time);
                self.queues.exec.push(cloudlet);
            } else {
                i += 1;
            }
        }
    }

    /// Starts the cloudlet if there are enough free PEs, otherwise puts it to the end of the waiting list.
    fn enqueue(&mut self, mut cloudlet: Cloudlet, time: f64) -> Option<f64> {
        if cloudlet.pes <= self.free_pes() {
            cloudlet.set_status(CloudletStatus::InExec, time);
            let estimate = self.queues.estimated_finish_time(&cloudlet, time, self.per_pe_mips());
            self.queues.exec.push(cloudlet);
            estimate
        } else {
            if cloudlet.status() != CloudletStatus::Ready {
                cloudlet.set_status(CloudletStatus::Ready, time);
            }
            self.queues.waiting.push(cloudlet);
            None
        }
    }
}

impl CloudletScheduler for SpaceSharedScheduler {
    fn update_processing(&mut self, time: f64, mips_share: &[f64]) -> Option<f64> {
        self.queues.mips_share = mips_share.to_vec();
        let per_pe_mips = self.per_pe_mips();
        self.queues.advance(time, per_pe_mips);
        self.admit_waiting(time);
        self.queues.next_completion(time, per_pe_mips)
    }

    fn cloudlet_submit(&mut self, cloudlet: Cloudlet, time: f64) -> Result<Option<f64>, CloudError> {
        let vm_pes = self.queues.vm_pes();
        if vm_pes > 0 && cloudlet.pes > vm_pes {
            return Err(CloudError::InsufficientPes {
                id: cloudlet.id,
                required: cloudlet.pes,
                available: vm_pes,
            });
        }
        let cloudlet = self.queues.accept(cloudlet, time)?;
        Ok(self.enqueue(cloudlet, time))
    }

    fn cloudlet_pause(&mut self, cloudlet_id: u32, time: f64) -> Result<(), CloudError> {
        self.queues.pause(cloudlet_id, time)?;
        self.admit_waiting(time);
        Ok(())
    }

    fn cloudlet_resume(&mut self, cloudlet_id: u32, time: f64) -> Result<Option<f64>, CloudError> {
        let cloudlet = self.queues.take_paused(cloudlet_id)?;
        Ok(self.enqueue(cloudlet, time))
    }

    fn cloudlet_cancel(&mut self, cloudlet_id: u32, time: f64) -> Result<Cloudlet, CloudError> {
        let cloudlet = self.queues.cancel(cloudlet_id, time)?;
        self.admit_waiting(time);
        Ok(cloudlet)
    }

    fn cloudlet_fail_all(&mut self, time: f64) -> Vec<Cloudlet> {
        self.queues.fail_all(time)
    }

    fn allocated_mips_for_cloudlet(&self, cloudlet_id: u32) -> f64 {
        match self.queues.exec.iter().find(|c| c.id == cloudlet_id) {
            Some(cloudlet) => self.per_pe_mips() * cloudlet.pes as f64,
            None => 0.,
        }
    }

    fn used_mips(&self) -> f64 {
        self.per_pe_mips() * self.queues.pes_in_use() as f64
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
