//! Cloud model: hosts, virtual machines, cloudlets and the policies which manage them.

pub mod allocation_policies;
pub mod allocation_policy;
pub mod broker;
pub mod cloudlet;
pub mod cloudlet_scheduler;
pub mod cloudlet_schedulers;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod events;
pub mod host;
pub mod overload;
pub mod overload_detectors;
pub mod provisioner;
pub mod utilization;
pub mod vm;
pub mod vm_selection_policies;
pub mod vm_selection_policy;
