//! Main entry point for cloud simulations.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use simcore::simulation::Simulation;

use crate::core::allocation_policy::{allocation_policy_from_config, VmAllocationPolicy};
use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::error::CloudError;
use crate::core::host::{Host, HostSpec};
use crate::core::utilization::export_utilization_csv;
use crate::core::vm::{Vm, VmSpec};

/// Wires the simulation kernel with a datacenter and brokers.
///
/// Hosts listed in the config are added to the datacenter on creation. All state returned by the
/// query methods is an owned snapshot taken at the current simulation time.
pub struct CloudSimulation {
    datacenter: Rc<RefCell<Datacenter>>,
    datacenter_id: u32,
    brokers: BTreeMap<u32, Rc<RefCell<Broker>>>,
    next_vm_id: u32,
    sim: Simulation,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Result<Self, CloudError> {
        let allocation_policy = allocation_policy_from_config(&sim_config)?;
        let sim_config = rc!(sim_config);
        let datacenter = rc!(refcell!(Datacenter::new(
            allocation_policy,
            sim.create_context("datacenter"),
            sim_config.clone(),
        )));
        let datacenter_id = sim.add_handler("datacenter", datacenter.clone());
        for host_config in &sim_config.hosts {
            for _ in 0..host_config.count.unwrap_or(1) {
                datacenter.borrow_mut().add_host(host_config.spec());
            }
        }
        Ok(Self {
            datacenter,
            datacenter_id,
            brokers: BTreeMap::new(),
            next_vm_id: 0,
            sim,
            sim_config,
        })
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    pub fn datacenter_id(&self) -> u32 {
        self.datacenter_id
    }

    /// Adds host to the datacenter and returns its id.
    pub fn add_host(&mut self, spec: HostSpec) -> u32 {
        self.datacenter.borrow_mut().add_host(spec)
    }

    pub fn set_allocation_policy(&mut self, allocation_policy: Box<dyn VmAllocationPolicy>) {
        self.datacenter.borrow_mut().set_allocation_policy(allocation_policy);
    }

    /// Creates broker component bound to the datacenter and returns its id.
    pub fn add_broker(&mut self, name: &str) -> u32 {
        let broker = rc!(refcell!(Broker::new(
            self.datacenter_id,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    pub fn broker(&self, broker_id: u32) -> Rc<RefCell<Broker>> {
        match self.brokers.get(&broker_id) {
            Some(broker) => broker.clone(),
            None => panic!("Broker with id {} does not exist", broker_id),
        }
    }

    pub fn submit_vm(&mut self, broker_id: u32, spec: VmSpec) {
        self.next_vm_id = self.next_vm_id.max(spec.id + 1);
        self.broker(broker_id).borrow_mut().submit_vm(spec);
    }

    /// Submits VMs described by the VM types from the config, returns ids of the VMs.
    pub fn submit_configured_vms(&mut self, broker_id: u32) -> Vec<u32> {
        let mut ids = Vec::new();
        for vm_config in self.sim_config.vms.clone() {
            for _ in 0..vm_config.count.unwrap_or(1) {
                let spec = VmSpec::new(
                    self.next_vm_id,
                    vm_config.pes,
                    vm_config.mips,
                    vm_config.ram,
                    vm_config.bw,
                    vm_config.storage,
                )
                .with_scheduler(vm_config.scheduler);
                ids.push(spec.id);
                self.submit_vm(broker_id, spec);
            }
        }
        ids
    }

    pub fn submit_cloudlet(&mut self, broker_id: u32, cloudlet: Cloudlet) {
        self.broker(broker_id).borrow_mut().submit_cloudlet(cloudlet);
    }

    pub fn pause_cloudlet(&mut self, broker_id: u32, vm_id: u32, cloudlet_id: u32) {
        self.broker(broker_id).borrow_mut().pause_cloudlet(vm_id, cloudlet_id);
    }

    pub fn resume_cloudlet(&mut self, broker_id: u32, vm_id: u32, cloudlet_id: u32) {
        self.broker(broker_id).borrow_mut().resume_cloudlet(vm_id, cloudlet_id);
    }

    pub fn cancel_cloudlet(&mut self, broker_id: u32, vm_id: u32, cloudlet_id: u32) {
        self.broker(broker_id).borrow_mut().cancel_cloudlet(vm_id, cloudlet_id);
    }

    pub fn destroy_vm(&mut self, broker_id: u32, vm_id: u32) {
        self.broker(broker_id).borrow_mut().destroy_vm(vm_id);
    }

    pub fn host(&self, host_id: u32) -> Option<Host> {
        self.datacenter.borrow().host(host_id).cloned()
    }

    pub fn hosts(&self) -> Vec<Host> {
        self.datacenter.borrow().hosts().to_vec()
    }

    pub fn vm(&self, vm_id: u32) -> Option<Vm> {
        self.datacenter.borrow().vm(vm_id).cloned()
    }

    /// Number of completed VM migrations.
    pub fn migration_count(&self) -> u32 {
        self.datacenter.borrow().migration_count()
    }

    /// Writes utilization history of all hosts to CSV file.
    pub fn export_utilization_csv(&self, path: &str) -> Result<(), CloudError> {
        export_utilization_csv(path, self.datacenter.borrow().hosts())
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    /// Stops the simulation at the specified time, later events are not delivered.
    pub fn terminate_at(&mut self, time: f64) {
        self.sim.terminate_at(time);
    }

    /// Performs a single step through the simulation.
    ///
    /// Returns `true` if there could be more pending events and `false` otherwise.
    pub fn step(&mut self) -> bool {
        self.sim.step()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events();
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }
}
