//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::core::cloudlet_scheduler::{CloudletScheduler, CloudletSchedulerKind};

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmStatus {
    Running,
    Migrating,
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Running => write!(f, "running"),
            VmStatus::Migrating => write!(f, "migrating"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Resource requirements of a virtual machine as requested by a broker.
///
/// MIPS is the capacity of each VM PE, RAM and storage are in MB, bandwidth is in Mbit/s.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VmSpec {
    pub id: u32,
    pub pes: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
    #[serde(default)]
    pub scheduler: CloudletSchedulerKind,
}

impl VmSpec {
    pub fn new(id: u32, pes: u32, mips: f64, ram: u64, bw: u64, storage: u64) -> Self {
        Self {
            id,
            pes,
            mips,
            ram,
            bw,
            storage,
            scheduler: CloudletSchedulerKind::TimeShared,
        }
    }

    pub fn with_scheduler(mut self, scheduler: CloudletSchedulerKind) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn total_mips(&self) -> f64 {
        self.pes as f64 * self.mips
    }
}

/// Represents virtual machine (VM) created in a datacenter.
///
/// While the VM is migrating it still runs on the source host and holds resources on both source
/// and target hosts.
#[derive(Clone)]
pub struct Vm {
    pub id: u32,
    pub broker: u32,
    pub spec: VmSpec,
    pub submission_time: f64,
    pub creation_time: Option<f64>,
    pub finish_time: Option<f64>,
    host: Option<u32>,
    status: VmStatus,
    scheduler: Box<dyn CloudletScheduler>,
}

impl Vm {
    pub fn new(spec: VmSpec, broker: u32, time: f64) -> Self {
        Self {
            id: spec.id,
            broker,
            submission_time: time,
            creation_time: None,
            finish_time: None,
            host: None,
            status: VmStatus::Running,
            scheduler: spec.scheduler.build(),
            spec,
        }
    }

    pub fn host(&self) -> Option<u32> {
        self.host
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn is_in_migration(&self) -> bool {
        self.status == VmStatus::Migrating
    }

    pub fn total_mips(&self) -> f64 {
        self.spec.total_mips()
    }

    /// MIPS of each VM PE, the VM always receives its full requested capacity.
    pub fn mips_share(&self) -> Vec<f64> {
        vec![self.spec.mips; self.spec.pes as usize]
    }

    pub fn used_mips(&self) -> f64 {
        self.scheduler.used_mips()
    }

    /// Fraction of VM capacity used by its cloudlets.
    pub fn utilization(&self) -> f64 {
        if self.total_mips() <= 0. {
            return 0.;
        }
        self.used_mips() / self.total_mips()
    }

    pub fn scheduler(&self) -> &dyn CloudletScheduler {
        self.scheduler.as_ref()
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut dyn CloudletScheduler {
        self.scheduler.as_mut()
    }

    /// Advances the VM cloudlets up to `time`, returns the next expected cloudlet completion time.
    pub fn update_processing(&mut self, time: f64) -> Option<f64> {
        let share = if self.host.is_some() { self.mips_share() } else { Vec::new() };
        self.scheduler.update_processing(time, &share)
    }

    pub(crate) fn place(&mut self, host_id: u32, time: f64) {
        self.host = Some(host_id);
        if self.creation_time.is_none() {
            self.creation_time = Some(time);
        }
    }

    pub(crate) fn unplace(&mut self) -> Option<u32> {
        self.host.take()
    }

    pub(crate) fn start_migration(&mut self) {
        self.status = VmStatus::Migrating;
    }

    pub(crate) fn finish_migration(&mut self, target: u32) {
        self.host = Some(target);
        self.status = VmStatus::Running;
    }

    pub(crate) fn destroy(&mut self, time: f64) {
        self.status = VmStatus::Destroyed;
        self.finish_time = Some(time);
    }
}
