use simcore::simulation::Simulation;

use cloudsim::core::allocation_policies::best_fit::BestFit;
use cloudsim::core::allocation_policies::first_fit::FirstFit;
use cloudsim::core::allocation_policies::simple::Simple;
use cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::host::{Host, HostSpec};
use cloudsim::core::vm::VmSpec;
use cloudsim::simulation::CloudSimulation;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn new_cloud_sim() -> CloudSimulation {
    let sim = Simulation::new(123);
    let sim_config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    CloudSimulation::new(sim, sim_config).unwrap()
}

fn host_spec(pes: u32) -> HostSpec {
    HostSpec {
        pes,
        mips: 1000.,
        ram: 4096,
        bw: 1000,
        storage: 100000,
    }
}

fn vm_spec(id: u32, pes: u32) -> VmSpec {
    VmSpec::new(id, pes, 1000., 512, 100, 1000)
}

fn assert_capacity_respected(hosts: &[Host]) {
    for host in hosts {
        assert!(host.allocated_pes() <= host.spec.pes);
        assert!(host.allocated_ram() <= host.spec.ram);
        assert!(host.allocated_bw() <= host.spec.bw);
        assert!(host.allocated_storage() <= host.spec.storage);
        assert!(host.allocated_mips() <= host.total_mips());
    }
}

#[test]
// Simple policy puts VM on the host with most free PEs, the first such host wins ties.
fn test_simple() {
    let mut cloud_sim = new_cloud_sim();
    cloud_sim.set_allocation_policy(Box::new(Simple::new()));
    let h0 = cloud_sim.add_host(host_spec(4));
    let h1 = cloud_sim.add_host(host_spec(8));
    let h2 = cloud_sim.add_host(host_spec(8));
    let b = cloud_sim.add_broker("broker");

    for id in 0..5 {
        cloud_sim.submit_vm(b, vm_spec(id, 2));
    }
    cloud_sim.step_for_duration(1.);

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().vm_host(0), Some(h1));
    assert_eq!(broker.borrow().vm_host(1), Some(h2));
    assert_eq!(broker.borrow().vm_host(2), Some(h1));
    assert_eq!(broker.borrow().vm_host(3), Some(h2));
    // all hosts have 4 free PEs, h0 comes first
    assert_eq!(broker.borrow().vm_host(4), Some(h0));
    assert_eq!(cloud_sim.host(h0).unwrap().free_pes(), 2);
    assert_eq!(cloud_sim.host(h1).unwrap().free_pes(), 4);
}

#[test]
// First fit continues the scan from the host following the last used one and wraps around.
fn test_first_fit_wraps_around() {
    let mut cloud_sim = new_cloud_sim();
    cloud_sim.set_allocation_policy(Box::new(FirstFit::new()));
    let h0 = cloud_sim.add_host(host_spec(4));
    let h1 = cloud_sim.add_host(host_spec(4));
    let h2 = cloud_sim.add_host(host_spec(4));
    let b = cloud_sim.add_broker("broker");

    cloud_sim.submit_vm(b, vm_spec(0, 2));
    cloud_sim.submit_vm(b, vm_spec(1, 2));
    cloud_sim.submit_vm(b, vm_spec(2, 4));
    cloud_sim.submit_vm(b, vm_spec(3, 2));
    cloud_sim.submit_vm(b, vm_spec(4, 2));
    cloud_sim.step_for_duration(1.);

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().vm_host(0), Some(h0));
    assert_eq!(broker.borrow().vm_host(1), Some(h1));
    assert_eq!(broker.borrow().vm_host(2), Some(h2));
    assert_eq!(broker.borrow().vm_host(3), Some(h0));
    assert_eq!(broker.borrow().vm_host(4), Some(h1));
    assert!(cloud_sim.hosts().iter().all(|h| h.free_pes() == 0));
}

#[test]
// Best fit selects the suitable host with the fewest free PEs.
fn test_best_fit() {
    let mut cloud_sim = new_cloud_sim();
    cloud_sim.set_allocation_policy(Box::new(BestFit::new()));
    let h0 = cloud_sim.add_host(host_spec(8));
    let h1 = cloud_sim.add_host(host_spec(4));
    let h2 = cloud_sim.add_host(host_spec(6));
    let b = cloud_sim.add_broker("broker");

    cloud_sim.submit_vm(b, vm_spec(0, 3));
    cloud_sim.submit_vm(b, vm_spec(1, 2));
    cloud_sim.submit_vm(b, vm_spec(2, 5));
    cloud_sim.step_for_duration(1.);

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().vm_host(0), Some(h1));
    // h1 has only one free PE left
    assert_eq!(broker.borrow().vm_host(1), Some(h2));
    assert_eq!(broker.borrow().vm_host(2), Some(h0));
}

#[test]
// VM which does not fit any host is retried every second and fails after the timeout of 5 seconds.
// Cloudlets waiting for the VM fail with it.
fn test_placement_timeout() {
    let mut cloud_sim = new_cloud_sim();
    let h = cloud_sim.add_host(host_spec(2));
    let b = cloud_sim.add_broker("broker");

    cloud_sim.submit_vm(b, vm_spec(0, 4));
    cloud_sim.submit_cloudlet(b, Cloudlet::new(0, 0, 1000., 1));

    cloud_sim.step_for_duration(5.5);
    assert!(cloud_sim.broker(b).borrow().failed_vms().is_empty());
    assert!(cloud_sim.broker(b).borrow().returned_cloudlets().is_empty());

    cloud_sim.step_until_no_events();
    assert_eq!(cloud_sim.current_time(), 6.);
    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().failed_vms(), vec![0]);
    assert!(broker.borrow().created_vms().is_empty());
    let cloudlet = broker.borrow().returned_cloudlet(0).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Failed);
    assert_eq!(cloudlet.finish_time, Some(6.));
    assert_eq!(cloud_sim.host(h).unwrap().allocated_pes(), 0);
    assert!(cloud_sim.vm(0).is_none());

    // cloudlets for the failed VM fail right away
    cloud_sim.submit_cloudlet(b, Cloudlet::new(1, 0, 1000., 1));
    assert_eq!(
        broker.borrow().returned_cloudlet(1).unwrap().status(),
        CloudletStatus::Failed
    );
}

#[test]
// VM is placed on retry once another VM frees the host.
fn test_placement_retry() {
    let mut cloud_sim = new_cloud_sim();
    let h = cloud_sim.add_host(host_spec(2));
    let b = cloud_sim.add_broker("broker");

    cloud_sim.submit_vm(b, vm_spec(0, 2));
    cloud_sim.submit_vm(b, vm_spec(1, 2));
    cloud_sim.step_for_duration(2.5);
    assert_eq!(cloud_sim.current_time(), 2.);
    assert_eq!(cloud_sim.broker(b).borrow().created_vms(), vec![0]);

    cloud_sim.destroy_vm(b, 0);
    cloud_sim.step_for_duration(2.);

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().destroyed_vms(), vec![0]);
    assert_eq!(broker.borrow().vm_host(1), Some(h));
    assert!(broker.borrow().failed_vms().is_empty());
    let vm = cloud_sim.vm(1).unwrap();
    assert_eq!(vm.host(), Some(h));
    assert_eq!(vm.creation_time, Some(3.));
    assert_eq!(cloud_sim.host(h).unwrap().vm_ids(), vec![1]);
}

#[test]
// Host resources are never overcommitted while VMs come and go.
fn test_capacity_invariant() {
    let mut cloud_sim = new_cloud_sim();
    cloud_sim.set_allocation_policy(Box::new(BestFit::new()));
    cloud_sim.add_host(host_spec(4));
    cloud_sim.add_host(host_spec(6));
    cloud_sim.add_host(host_spec(8));
    let b = cloud_sim.add_broker("broker");

    for i in 0..8 {
        let pes = 1 + i % 3;
        cloud_sim.submit_vm(b, vm_spec(i, pes));
        cloud_sim.submit_cloudlet(b, Cloudlet::new(i, i, 1000. * (1 + i % 5) as f64, pes));
    }

    cloud_sim.terminate_at(100.);
    while cloud_sim.step() {
        assert_capacity_respected(&cloud_sim.hosts());
    }

    let broker = cloud_sim.broker(b);
    assert_eq!(broker.borrow().created_vms().len(), 8);
    assert_eq!(broker.borrow().returned_cloudlets().len(), 8);
    assert!(broker
        .borrow()
        .returned_cloudlets()
        .iter()
        .all(|c| c.status() == CloudletStatus::Success));
    assert!(cloud_sim.hosts().iter().all(|h| h.allocated_pes() == 0));
}
